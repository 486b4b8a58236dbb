use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::{crc16, Crc16};
use crate::error::{FrameError, Rejection, Result};

/// Start sentinel, always the first byte of a frame.
pub const START: u8 = 0x01;

/// Header: start (1) + address (1) + command (1) + length (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Trailing checksum size.
pub const CHECKSUM_SIZE: usize = 2;

/// Fixed per-frame overhead: header + checksum = 6 bytes.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Largest payload the 1-byte LEN field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Largest possible frame on the wire.
pub const MAX_FRAME_SIZE: usize = FRAME_OVERHEAD + MAX_PAYLOAD;

/// Lowest assignable node address.
pub const ADDRESS_MIN: u8 = 1;

/// Highest assignable node address. 0 and 248-255 are reserved.
pub const ADDRESS_MAX: u8 = 247;

/// Returns true if `address` may appear on the bus (1-247).
pub fn is_valid_address(address: u8) -> bool {
    (ADDRESS_MIN..=ADDRESS_MAX).contains(&address)
}

/// A decoded frame borrowing its payload from the received buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRef<'a> {
    /// Node address (1-247).
    pub address: u8,
    /// Command byte.
    pub command: u8,
    /// Payload bytes; empty when LEN is 0.
    pub payload: &'a [u8],
}

impl<'a> FrameRef<'a> {
    /// Copy the payload out so the frame outlives the receive buffer.
    pub fn to_owned_frame(&self) -> Frame {
        Frame {
            address: self.address,
            command: self.command,
            payload: Bytes::copy_from_slice(self.payload),
        }
    }

    /// The total wire size of this frame (overhead + payload).
    pub fn wire_size(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }
}

/// An owned frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Node address (1-247).
    pub address: u8,
    /// Command byte.
    pub command: u8,
    /// The frame payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame. Nothing is validated until [`Frame::encode`].
    pub fn new(address: u8, command: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            command,
            payload: payload.into(),
        }
    }

    /// Borrowed view of this frame.
    pub fn as_frame_ref(&self) -> FrameRef<'_> {
        FrameRef {
            address: self.address,
            command: self.command,
            payload: self.payload.as_ref(),
        }
    }

    /// The total wire size of this frame (overhead + payload).
    pub fn wire_size(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Encode into a freshly allocated buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        encode_frame_to(self.address, self.command, &self.payload, &mut dst)?;
        Ok(dst.freeze())
    }
}

fn check_encodable(address: u8, payload: &[u8]) -> Result<u8> {
    if !is_valid_address(address) {
        return Err(FrameError::InvalidAddress(address));
    }
    u8::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_PAYLOAD,
    })
}

fn frame_checksum(address: u8, command: u8, len: u8, payload: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(&[address, command, len]);
    crc.update(payload);
    crc.finish()
}

/// Encode a frame into a caller-provided buffer.
///
/// Wire format:
/// ```text
/// ┌───────┬─────────┬─────────┬─────────┬───────────────┬──────────────┐
/// │ START │ ADDRESS │ COMMAND │ LEN     │ PAYLOAD       │ CRC16 (LE)   │
/// │ 0x01  │ 1-247   │ (1B)    │ (1B)    │ (LEN bytes)   │ over [1..4+N)│
/// └───────┴─────────┴─────────┴─────────┴───────────────┴──────────────┘
/// ```
///
/// Returns the number of bytes written (`6 + payload.len()`). Nothing is
/// written when an error is returned.
pub fn encode_frame(
    address: u8,
    command: u8,
    payload: &[u8],
    dst: &mut [u8],
) -> Result<usize> {
    let len = check_encodable(address, payload)?;
    let total = FRAME_OVERHEAD + payload.len();
    if dst.len() < total {
        return Err(FrameError::BufferTooSmall {
            needed: total,
            capacity: dst.len(),
        });
    }

    dst[0] = START;
    dst[1] = address;
    dst[2] = command;
    dst[3] = len;
    let body_end = HEADER_SIZE + payload.len();
    dst[HEADER_SIZE..body_end].copy_from_slice(payload);
    let crc = crc16(&dst[1..body_end]);
    dst[body_end..total].copy_from_slice(&crc.to_le_bytes());

    Ok(total)
}

/// Append an encoded frame to a growable buffer.
///
/// Returns the number of bytes appended.
pub fn encode_frame_to(
    address: u8,
    command: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<usize> {
    let len = check_encodable(address, payload)?;
    let total = FRAME_OVERHEAD + payload.len();

    dst.reserve(total);
    dst.put_u8(START);
    dst.put_u8(address);
    dst.put_u8(command);
    dst.put_u8(len);
    dst.put_slice(payload);
    dst.put_u16_le(frame_checksum(address, command, len, payload));

    Ok(total)
}

/// Decode exactly one frame from `src`.
///
/// The buffer must hold one complete frame and nothing else. Checks run in
/// order and stop at the first failure: minimum size, start sentinel, LEN
/// against actual size, checksum, address range.
pub fn decode_frame(src: &[u8]) -> Result<FrameRef<'_>> {
    if src.len() < FRAME_OVERHEAD {
        return Err(Rejection::TooShort { len: src.len() }.into());
    }

    if src[0] != START {
        return Err(Rejection::BadStart { found: src[0] }.into());
    }

    let declared = usize::from(src[3]);
    if FRAME_OVERHEAD + declared != src.len() {
        return Err(Rejection::LengthMismatch {
            declared,
            actual: src.len(),
        }
        .into());
    }

    let body_end = HEADER_SIZE + declared;
    let received = u16::from_le_bytes([src[body_end], src[body_end + 1]]);
    let computed = crc16(&src[1..body_end]);
    if received != computed {
        return Err(Rejection::ChecksumMismatch { received, computed }.into());
    }

    let address = src[1];
    if !is_valid_address(address) {
        return Err(Rejection::AddressOutOfRange(address).into());
    }

    Ok(FrameRef {
        address,
        command: src[2],
        payload: &src[HEADER_SIZE..body_end],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{POLL, REPLY};

    const POLL_3: [u8; 6] = [0x01, 0x03, 0x01, 0x00, 0x80, 0x50];
    const REPLY_3: [u8; 14] = [
        0x01, 0x03, 0x02, 0x08, 0xEB, 0x00, 0xC6, 0x00, 0xFF, 0x7F, 0xFF, 0x7F, 0x90, 0xEB,
    ];
    const REPLY_3_PAYLOAD: [u8; 8] = [0xEB, 0x00, 0xC6, 0x00, 0xFF, 0x7F, 0xFF, 0x7F];

    fn encode_vec(address: u8, command: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let n = encode_frame(address, command, payload, &mut buf).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn test_encode_poll_example() {
        let mut buf = [0u8; 64];
        let n = encode_frame(3, POLL, &[], &mut buf).unwrap();
        assert_eq!(n, 6);
        assert_eq!(&buf[..n], &POLL_3);
    }

    #[test]
    fn test_encode_reply_example() {
        let mut buf = [0u8; 64];
        let n = encode_frame(3, REPLY, &REPLY_3_PAYLOAD, &mut buf).unwrap();
        assert_eq!(n, 14);
        assert_eq!(&buf[..n], &REPLY_3);
    }

    #[test]
    fn test_encode_exact_capacity() {
        let mut buf = [0u8; 6];
        assert_eq!(encode_frame(247, POLL, &[], &mut buf).unwrap(), 6);
    }

    #[test]
    fn test_encode_field_offsets() {
        let wire = encode_vec(42, 0xAB, &[0x01, 0x02, 0x03]);
        assert_eq!(wire[0], START);
        assert_eq!(wire[1], 42);
        assert_eq!(wire[2], 0xAB);
        assert_eq!(wire[3], 3);
        assert_eq!(&wire[4..7], &[0x01, 0x02, 0x03]);
        assert_eq!(wire.len(), 9);
    }

    #[test]
    fn test_encode_rejects_reserved_addresses() {
        let mut buf = [0u8; 64];
        assert_eq!(
            encode_frame(0, POLL, &[], &mut buf),
            Err(FrameError::InvalidAddress(0))
        );
        assert_eq!(
            encode_frame(248, POLL, &[], &mut buf),
            Err(FrameError::InvalidAddress(248))
        );
        assert_eq!(
            encode_frame(255, POLL, &[], &mut buf),
            Err(FrameError::InvalidAddress(255))
        );
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buf = [0u8; 4];
        assert_eq!(
            encode_frame(1, POLL, &[], &mut buf),
            Err(FrameError::BufferTooSmall {
                needed: 6,
                capacity: 4
            })
        );

        let mut buf = [0u8; 13];
        assert!(matches!(
            encode_frame(3, REPLY, &REPLY_3_PAYLOAD, &mut buf),
            Err(FrameError::BufferTooSmall { needed: 14, .. })
        ));
    }

    #[test]
    fn test_encode_leaves_buffer_untouched_on_error() {
        let mut buf = [0xAAu8; 4];
        let _ = encode_frame(1, POLL, &[], &mut buf);
        assert_eq!(buf, [0xAA; 4]);
    }

    #[test]
    fn test_encode_payload_too_large() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        let mut buf = vec![0u8; MAX_FRAME_SIZE + 1];
        assert_eq!(
            encode_frame(1, POLL, &payload, &mut buf),
            Err(FrameError::PayloadTooLarge {
                size: 256,
                max: 255
            })
        );
    }

    #[test]
    fn test_encode_max_payload() {
        let payload = vec![0x5A; MAX_PAYLOAD];
        let wire = encode_vec(7, REPLY, &payload);
        assert_eq!(wire.len(), MAX_FRAME_SIZE);
        let frame = decode_frame(&wire).unwrap();
        assert_eq!(frame.payload, payload.as_slice());
    }

    #[test]
    fn test_encode_to_bytes_mut_matches_slice_encoder() {
        let mut dst = BytesMut::new();
        let n = encode_frame_to(3, REPLY, &REPLY_3_PAYLOAD, &mut dst).unwrap();
        assert_eq!(n, 14);
        assert_eq!(dst.as_ref(), &REPLY_3);
    }

    #[test]
    fn test_encode_to_appends() {
        let mut dst = BytesMut::from(&b"xx"[..]);
        encode_frame_to(3, POLL, &[], &mut dst).unwrap();
        assert_eq!(&dst[..2], b"xx");
        assert_eq!(&dst[2..], &POLL_3);
    }

    #[test]
    fn test_encode_to_rejects_without_writing() {
        let mut dst = BytesMut::new();
        assert!(encode_frame_to(0, POLL, &[], &mut dst).is_err());
        assert!(dst.is_empty());
    }

    #[test]
    fn test_owned_frame_encode() {
        let frame = Frame::new(3, REPLY, Bytes::from_static(&REPLY_3_PAYLOAD));
        assert_eq!(frame.wire_size(), 14);
        assert_eq!(frame.encode().unwrap().as_ref(), &REPLY_3);
        assert_eq!(
            Frame::new(0, POLL, Bytes::new()).encode(),
            Err(FrameError::InvalidAddress(0))
        );
    }

    #[test]
    fn test_decode_poll_example() {
        let frame = decode_frame(&POLL_3).unwrap();
        assert_eq!(frame.address, 3);
        assert_eq!(frame.command, POLL);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_decode_reply_example() {
        let frame = decode_frame(&REPLY_3).unwrap();
        assert_eq!(frame.address, 3);
        assert_eq!(frame.command, REPLY);
        assert_eq!(frame.payload, &REPLY_3_PAYLOAD);
        assert_eq!(frame.wire_size(), 14);
    }

    #[test]
    fn test_decode_payload_borrows_input() {
        let wire = REPLY_3;
        let frame = decode_frame(&wire).unwrap();
        assert!(std::ptr::eq(frame.payload.as_ptr(), wire[4..].as_ptr()));
    }

    #[test]
    fn test_roundtrip_all_addresses_and_commands() {
        let payload: Vec<u8> = (0..250u16).map(|i| i as u8).collect();
        for len in 0..payload.len() {
            let wire = encode_vec(1, REPLY, &payload[..len]);
            assert_eq!(decode_frame(&wire).unwrap().payload, &payload[..len]);
        }
        for address in ADDRESS_MIN..=ADDRESS_MAX {
            let command = address.wrapping_mul(31);
            let len = usize::from(address) % 250;
            let wire = encode_vec(address, command, &payload[..len]);
            let frame = decode_frame(&wire).unwrap();
            assert_eq!(frame.address, address);
            assert_eq!(frame.command, command);
            assert_eq!(frame.payload, &payload[..len]);
        }
        for command in 0..=u8::MAX {
            let wire = encode_vec(100, command, &[command]);
            let frame = decode_frame(&wire).unwrap();
            assert_eq!(frame.command, command);
            assert_eq!(frame.payload, &[command]);
        }
    }

    #[test]
    fn test_to_owned_frame() {
        let owned = decode_frame(&REPLY_3).unwrap().to_owned_frame();
        assert_eq!(owned, Frame::new(3, REPLY, REPLY_3_PAYLOAD.to_vec()));
        assert_eq!(owned.as_frame_ref(), decode_frame(&REPLY_3).unwrap());
    }

    #[test]
    fn test_decode_too_short() {
        for len in 0..FRAME_OVERHEAD {
            assert_eq!(
                decode_frame(&POLL_3[..len]),
                Err(FrameError::InvalidFrame(Rejection::TooShort { len }))
            );
        }
    }

    #[test]
    fn test_decode_bad_start() {
        let mut wire = POLL_3;
        wire[0] = 0xFF;
        assert_eq!(
            decode_frame(&wire),
            Err(FrameError::InvalidFrame(Rejection::BadStart { found: 0xFF }))
        );
    }

    #[test]
    fn test_decode_trailing_byte() {
        let mut wire = POLL_3.to_vec();
        wire.push(0x00);
        assert_eq!(
            decode_frame(&wire),
            Err(FrameError::InvalidFrame(Rejection::LengthMismatch {
                declared: 0,
                actual: 7
            }))
        );
    }

    #[test]
    fn test_decode_truncated_payload() {
        let wire = &REPLY_3[..REPLY_3.len() - 1];
        assert!(matches!(
            decode_frame(wire),
            Err(FrameError::InvalidFrame(Rejection::LengthMismatch {
                declared: 8,
                actual: 13
            }))
        ));
    }

    #[test]
    fn test_decode_any_checksum_bit_flip() {
        for frame in [&POLL_3[..], &REPLY_3[..]] {
            for byte in frame.len() - 2..frame.len() {
                for bit in 0..8 {
                    let mut wire = frame.to_vec();
                    wire[byte] ^= 1 << bit;
                    let err = decode_frame(&wire).unwrap_err();
                    assert!(matches!(
                        err,
                        FrameError::InvalidFrame(Rejection::ChecksumMismatch { .. })
                    ));
                }
            }
        }
    }

    #[test]
    fn test_decode_corrupted_payload() {
        let mut wire = REPLY_3;
        wire[5] ^= 0x01;
        assert!(decode_frame(&wire).unwrap_err().is_invalid_frame());
    }

    #[test]
    fn test_decode_reserved_address_with_valid_checksum() {
        for address in [0u8, 248, 255] {
            let mut wire = vec![START, address, POLL, 0x00];
            let crc = crc16(&wire[1..]);
            wire.extend_from_slice(&crc.to_le_bytes());
            assert_eq!(
                decode_frame(&wire),
                Err(FrameError::InvalidFrame(Rejection::AddressOutOfRange(
                    address
                )))
            );
        }
    }

    #[test]
    fn test_decode_reports_first_failure() {
        // Bad start and bad checksum: the start byte is reported.
        let mut wire = POLL_3;
        wire[0] = 0x02;
        wire[5] ^= 0xFF;
        assert!(matches!(
            decode_frame(&wire),
            Err(FrameError::InvalidFrame(Rejection::BadStart { .. }))
        ));

        // Reserved address and bad checksum: the checksum is reported.
        let mut wire = POLL_3;
        wire[1] = 0;
        assert!(matches!(
            decode_frame(&wire),
            Err(FrameError::InvalidFrame(Rejection::ChecksumMismatch { .. }))
        ));
    }
}
