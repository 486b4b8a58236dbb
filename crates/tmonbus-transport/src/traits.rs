use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// A half-duplex link onto the sensor bus.
///
/// `receive` hands back one burst of bytes, which the caller treats as one
/// candidate frame. How a burst boundary is found is up to the link: a UDP
/// datagram, a gap of silence on a serial line, a channel message.
pub trait BusLink {
    /// Transmit one frame.
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for the next burst.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Bytes>>;
}

impl<L: BusLink + ?Sized> BusLink for &mut L {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Bytes>> {
        (**self).receive(timeout)
    }
}

impl<L: BusLink + ?Sized> BusLink for Box<L> {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Bytes>> {
        (**self).receive(timeout)
    }
}
