/// Why a received byte sequence was not accepted as a frame.
///
/// Checks run in a fixed order and the first failing one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Fewer bytes than the fixed 6-byte frame overhead.
    #[error("frame too short ({len} bytes, minimum 6)")]
    TooShort { len: usize },

    /// The first byte is not the start sentinel.
    #[error("bad start byte 0x{found:02X} (expected 0x01)")]
    BadStart { found: u8 },

    /// The LEN field disagrees with the number of bytes actually present.
    #[error("length mismatch (LEN says {declared} payload bytes, frame is {actual} bytes)")]
    LengthMismatch { declared: usize, actual: usize },

    /// The trailing CRC does not match the frame contents.
    #[error("checksum mismatch (received 0x{received:04X}, computed 0x{computed:04X})")]
    ChecksumMismatch { received: u16, computed: u16 },

    /// Checksum is fine but the address is reserved.
    #[error("address {0} out of range (must be 1-247)")]
    AddressOutOfRange(u8),
}

/// Errors that can occur during frame and reply-payload encoding/decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The input is not a well-formed frame.
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] Rejection),

    /// Refused to build a frame for a reserved or broadcast address.
    #[error("invalid address {0} (must be 1-247)")]
    InvalidAddress(u8),

    /// The payload does not fit the 1-byte LEN field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The caller-provided output buffer cannot hold the frame.
    #[error("output buffer too small ({capacity} bytes, need {needed})")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// A REPLY payload must be exactly 8 bytes.
    #[error("reply payload must be 8 bytes, got {0}")]
    InvalidReplyLength(usize),
}

impl FrameError {
    /// True for failures of [`decode_frame`](crate::decode_frame).
    pub fn is_invalid_frame(&self) -> bool {
        matches!(self, FrameError::InvalidFrame(_))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
