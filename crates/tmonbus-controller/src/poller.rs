use std::time::Instant;

use tmonbus_frame::{decode_frame, encode_frame, is_valid_address, FRAME_OVERHEAD, POLL};
use tmonbus_transport::BusLink;
use tracing::{debug, info, warn};

use crate::config::PollerConfig;
use crate::error::{ControllerError, Result};
use crate::reading::Reading;

/// Polls a fixed set of nodes over one bus link.
///
/// One transaction is in flight at a time: POLL, then wait up to the
/// configured reply timeout for the answer.
pub struct Poller<L> {
    link: L,
    config: PollerConfig,
}

impl<L: BusLink> Poller<L> {
    /// Create a poller; the configuration is validated first.
    pub fn new(link: L, config: PollerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { link, config })
    }

    /// Poll one node and return its readings.
    ///
    /// The answer must decode, be a REPLY and carry exactly four channels.
    /// Valid frames from other addresses (a late answer to an earlier POLL)
    /// are skipped until the reply timeout runs out. Nothing is retried.
    pub fn poll(&mut self, address: u8) -> Result<Reading> {
        if !is_valid_address(address) {
            return Err(ControllerError::InvalidAddress(address));
        }

        let mut buf = [0u8; FRAME_OVERHEAD];
        let len = encode_frame(address, POLL, &[], &mut buf)?;
        self.link.send(&buf[..len])?;

        let timeout = self.config.reply_timeout();
        let deadline = Instant::now() + timeout;
        let mut stray = None;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let Some(raw) = self.link.receive(remaining)? else {
                break;
            };

            let frame = decode_frame(&raw)?;
            if frame.address != address {
                debug!(expected = address, actual = frame.address, "ignoring stray reply");
                stray = Some(frame.address);
                continue;
            }
            let reading = Reading::from_frame(&frame)?;
            info!("{reading}");
            return Ok(reading);
        }

        Err(match stray {
            Some(actual) => ControllerError::AddressMismatch {
                expected: address,
                actual,
            },
            None => ControllerError::Timeout { address, timeout },
        })
    }

    /// Poll every configured node once, in order.
    ///
    /// Nodes that fail are left out of the result.
    pub fn poll_all(&mut self) -> Vec<Reading> {
        let nodes = self.config.nodes.clone();
        let mut readings = Vec::with_capacity(nodes.len());
        for address in nodes {
            match self.poll(address) {
                Ok(reading) => readings.push(reading),
                Err(err) if err.is_node_failure() => {
                    debug!(address, error = %err, "node skipped");
                }
                Err(err) => {
                    warn!(address, error = %err, "poll failed");
                }
            }
        }
        readings
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Borrow the link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Consume the poller and return its link.
    pub fn into_link(self) -> L {
        self.link
    }
}
