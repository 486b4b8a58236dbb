use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::traits::BusLink;

/// In-process link. Each `send` arrives as one burst on the other end.
#[derive(Debug)]
pub struct MemoryLink {
    tx: Sender<Bytes>,
    rx: Receiver<Bytes>,
}

impl MemoryLink {
    /// Create two connected link ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }
}

impl BusLink for MemoryLink {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.tx
            .send(Bytes::copy_from_slice(frame))
            .map_err(|_| TransportError::Closed)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Bytes>> {
        match self.rx.recv_timeout(timeout) {
            Ok(burst) => Ok(Some(burst)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}
