use std::fmt;

use serde::{Deserialize, Serialize};
use tmonbus_frame::{FrameRef, ReplyPayload, NUM_CHANNELS, REPLY};

use crate::error::{ControllerError, Result};

/// One set of channel readings from a node.
///
/// Temperatures are tenths of a degree Celsius; `None` marks a channel the
/// node reported as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub address: u8,
    pub temps: [Option<i16>; NUM_CHANNELS],
}

impl Reading {
    /// Build from raw wire values, mapping the invalid sentinel to `None`.
    pub fn from_raw(address: u8, raw: [i16; NUM_CHANNELS]) -> Self {
        Self {
            address,
            temps: ReplyPayload::new(raw).channels(),
        }
    }

    /// Interpret a decoded frame as a REPLY.
    ///
    /// Fails for any other command or a payload that is not exactly the
    /// REPLY size.
    pub fn from_frame(frame: &FrameRef<'_>) -> Result<Self> {
        if frame.command != REPLY {
            return Err(ControllerError::UnexpectedCommand {
                address: frame.address,
                command: frame.command,
            });
        }
        let payload = ReplyPayload::decode(frame.payload)?;
        Ok(Self::from_raw(frame.address, payload.temps))
    }

    /// Channel value in degrees Celsius.
    pub fn celsius(&self, channel: usize) -> Option<f64> {
        self.temps
            .get(channel)
            .copied()
            .flatten()
            .map(|tenths| f64::from(tenths) / 10.0)
    }

    /// Number of channels carrying a valid value.
    pub fn valid_channels(&self) -> usize {
        self.temps.iter().filter(|temp| temp.is_some()).count()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}: temps=[", self.address)?;
        for (i, temp) in self.temps.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&fmt_temp(*temp))?;
        }
        f.write_str("]")
    }
}

/// Render a channel value for display: `23.5`, or `--.-` when invalid.
pub fn fmt_temp(temp: Option<i16>) -> String {
    match temp {
        Some(tenths) => format!("{:.1}", f64::from(tenths) / 10.0),
        None => "--.-".to_string(),
    }
}
