//! CRC-16/MODBUS.
//!
//! Reflected CRC-16 with polynomial 0x8005 (0xA001 bit-reversed), initial
//! register 0xFFFF and no final XOR. Deployed nodes depend on this exact
//! variant.

const INIT: u16 = 0xFFFF;
const POLY_REFLECTED: u16 = 0xA001;

/// Incremental CRC-16/MODBUS register.
///
/// Lets the encoder checksum header fields and payload without first copying
/// them into one contiguous buffer.
#[derive(Debug, Clone, Copy)]
pub struct Crc16 {
    register: u16,
}

impl Crc16 {
    /// A fresh register (0xFFFF).
    pub const fn new() -> Self {
        Self { register: INIT }
    }

    /// Feed bytes into the register.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.register ^= u16::from(byte);
            for _ in 0..8 {
                if self.register & 0x0001 != 0 {
                    self.register = (self.register >> 1) ^ POLY_REFLECTED;
                } else {
                    self.register >>= 1;
                }
            }
        }
    }

    /// Current checksum value.
    pub const fn finish(&self) -> u16 {
        self.register
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute CRC-16/MODBUS over `data`. Empty input yields 0xFFFF.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(data);
    crc.finish()
}
