//! REPLY payload: four temperature channels.
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┐
//! │ CH0      │ CH1      │ CH2      │ CH3      │
//! │ i16 LE   │ i16 LE   │ i16 LE   │ i16 LE   │
//! └──────────┴──────────┴──────────┴──────────┘
//! ```
//!
//! Values are tenths of a degree Celsius. [`TEMP_INVALID`] marks a channel
//! with no usable sensor; the codec passes it through untouched.

use bytes::Buf;

use crate::error::{FrameError, Result};

/// Channels per node.
pub const NUM_CHANNELS: usize = 4;

/// Wire size of a REPLY payload.
pub const REPLY_PAYLOAD_LEN: usize = NUM_CHANNELS * 2;

/// Sentinel for an invalid or unconnected channel.
pub const TEMP_INVALID: i16 = 0x7FFF;

/// Serialize four channel values, in channel order, as little-endian i16.
pub fn encode_reply(temps: &[i16; NUM_CHANNELS]) -> [u8; REPLY_PAYLOAD_LEN] {
    let mut out = [0u8; REPLY_PAYLOAD_LEN];
    for (slot, temp) in out.chunks_exact_mut(2).zip(temps) {
        slot.copy_from_slice(&temp.to_le_bytes());
    }
    out
}

/// Parse a REPLY payload. Anything but exactly 8 bytes is rejected.
pub fn decode_reply(payload: &[u8]) -> Result<[i16; NUM_CHANNELS]> {
    if payload.len() != REPLY_PAYLOAD_LEN {
        return Err(FrameError::InvalidReplyLength(payload.len()));
    }

    let mut buf = payload;
    let mut temps = [0i16; NUM_CHANNELS];
    for temp in &mut temps {
        *temp = buf.get_i16_le();
    }
    Ok(temps)
}

/// Decoded REPLY payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyPayload {
    /// Raw channel values, sentinel included.
    pub temps: [i16; NUM_CHANNELS],
}

impl ReplyPayload {
    pub fn new(temps: [i16; NUM_CHANNELS]) -> Self {
        Self { temps }
    }

    /// A payload with every channel marked invalid.
    pub fn all_invalid() -> Self {
        Self::new([TEMP_INVALID; NUM_CHANNELS])
    }

    pub fn encode(&self) -> [u8; REPLY_PAYLOAD_LEN] {
        encode_reply(&self.temps)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        decode_reply(payload).map(Self::new)
    }

    /// Channel value, or `None` when the channel is out of range or invalid.
    pub fn channel(&self, index: usize) -> Option<i16> {
        self.temps
            .get(index)
            .copied()
            .filter(|&temp| temp != TEMP_INVALID)
    }

    /// All channels with the sentinel mapped to `None`.
    pub fn channels(&self) -> [Option<i16>; NUM_CHANNELS] {
        std::array::from_fn(|i| self.channel(i))
    }
}

impl From<[i16; NUM_CHANNELS]> for ReplyPayload {
    fn from(temps: [i16; NUM_CHANNELS]) -> Self {
        Self::new(temps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_example_payload() {
        let bytes = encode_reply(&[235, 198, TEMP_INVALID, TEMP_INVALID]);
        assert_eq!(bytes, [0xEB, 0x00, 0xC6, 0x00, 0xFF, 0x7F, 0xFF, 0x7F]);
    }

    #[test]
    fn negative_values_are_twos_complement() {
        let bytes = encode_reply(&[-100, -1, i16::MIN, 0]);
        assert_eq!(&bytes[0..2], &[0x9C, 0xFF]);
        assert_eq!(&bytes[2..4], &[0xFF, 0xFF]);
        assert_eq!(&bytes[4..6], &[0x00, 0x80]);
        assert_eq!(&bytes[6..8], &[0x00, 0x00]);
    }

    #[test]
    fn roundtrip_boundary_values() {
        let cases = [
            [0, 0, 0, 0],
            [235, 198, TEMP_INVALID, TEMP_INVALID],
            [-100, 1, -1, 100],
            [i16::MIN, i16::MAX, i16::MIN + 1, TEMP_INVALID - 1],
            [TEMP_INVALID; 4],
        ];
        for temps in cases {
            assert_eq!(decode_reply(&encode_reply(&temps)).unwrap(), temps);
        }
    }

    #[test]
    fn decode_rejects_wrong_length() {
        for len in [0usize, 1, 7, 9, 16] {
            let payload = vec![0u8; len];
            assert_eq!(
                decode_reply(&payload),
                Err(FrameError::InvalidReplyLength(len))
            );
        }
    }

    #[test]
    fn sentinel_passes_through_decode() {
        let temps = decode_reply(&[0xFF, 0x7F, 0x00, 0x00, 0xFF, 0x7F, 0x01, 0x00]).unwrap();
        assert_eq!(temps, [TEMP_INVALID, 0, TEMP_INVALID, 1]);
    }

    #[test]
    fn payload_channels_hide_sentinel() {
        let reply = ReplyPayload::new([235, 198, TEMP_INVALID, -40]);
        assert_eq!(reply.channel(0), Some(235));
        assert_eq!(reply.channel(2), None);
        assert_eq!(reply.channel(4), None);
        assert_eq!(reply.channels(), [Some(235), Some(198), None, Some(-40)]);
        assert_eq!(ReplyPayload::decode(&reply.encode()).unwrap(), reply);
    }

    #[test]
    fn all_invalid_payload() {
        assert_eq!(ReplyPayload::all_invalid().channels(), [None; 4]);
    }
}
