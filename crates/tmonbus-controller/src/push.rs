use std::time::{Duration, Instant};

use tmonbus_frame::decode_frame;
use tmonbus_transport::BusLink;
use tracing::{debug, info};

use crate::error::{ControllerError, Result};
use crate::reading::Reading;

/// Collects REPLY frames that nodes transmit unprompted.
///
/// Nothing is sent; the nodes decide the timing.
pub struct PushReceiver<L> {
    link: L,
    skipped: u64,
}

impl<L: BusLink> PushReceiver<L> {
    pub fn new(link: L) -> Self {
        Self { link, skipped: 0 }
    }

    /// Wait up to `timeout` for the next valid pushed reading.
    ///
    /// Bursts that fail to decode, or decode to anything but a well-formed
    /// REPLY, are skipped and the wait continues. Returns `Ok(None)` once
    /// the timeout passes without a valid reading.
    pub fn recv(&mut self, timeout: Duration) -> Result<Option<Reading>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let Some(raw) = self.link.receive(remaining)? else {
                return Ok(None);
            };

            let reading = decode_frame(&raw)
                .map_err(ControllerError::from)
                .and_then(|frame| Reading::from_frame(&frame));
            match reading {
                Ok(reading) => {
                    info!("{reading}");
                    return Ok(Some(reading));
                }
                Err(err) => {
                    self.skipped += 1;
                    debug!(error = %err, len = raw.len(), "skipping pushed burst");
                }
            }
        }
    }

    /// Bursts discarded so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Consume the receiver and return its link.
    pub fn into_link(self) -> L {
        self.link
    }
}
