//! Frame codec for the tmon sensor-polling bus.
//!
//! A controller polls sensor nodes over a shared half-duplex line (RS-485 or
//! a UDP tunnel). Every message on the bus is a single frame:
//! - A 1-byte start sentinel (`0x01`)
//! - A 1-byte node address (1-247), command byte and payload length
//! - Up to 255 payload bytes
//! - A 2-byte little-endian CRC-16/MODBUS over everything after the sentinel
//!
//! Everything here is pure: no I/O, no retained state.

pub mod codec;
pub mod command;
pub mod crc;
pub mod error;
pub mod reply;

pub use codec::{
    decode_frame, encode_frame, encode_frame_to, is_valid_address, Frame, FrameRef, ADDRESS_MAX,
    ADDRESS_MIN, FRAME_OVERHEAD, MAX_FRAME_SIZE, MAX_PAYLOAD, START,
};
pub use command::{command_name, POLL, REPLY};
pub use crc::{crc16, Crc16};
pub use error::{FrameError, Rejection, Result};
pub use reply::{
    decode_reply, encode_reply, ReplyPayload, NUM_CHANNELS, REPLY_PAYLOAD_LEN, TEMP_INVALID,
};
