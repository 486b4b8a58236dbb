//! Command bytes.
//!
//! The frame layer carries any command byte; only these two have meaning on
//! the bus.

/// Controller asks the addressed node for its readings.
pub const POLL: u8 = 0x01;

/// Node answers with its four channel readings.
pub const REPLY: u8 = 0x02;

/// Returns a human-readable name for a command byte.
pub fn command_name(command: u8) -> &'static str {
    match command {
        POLL => "POLL",
        REPLY => "REPLY",
        _ => "UNKNOWN",
    }
}

/// Returns true if the command byte is one the bus defines.
pub fn is_known(command: u8) -> bool {
    matches!(command, POLL | REPLY)
}
