use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::BusLink;

/// Default inter-byte silence that ends a burst.
///
/// At 9600 baud one character takes about 1 ms; 20 ms of silence comfortably
/// separates frames on a polled bus.
pub const DEFAULT_IDLE_GAP: Duration = Duration::from_millis(20);

/// Default burst cap: the largest legal frame (6 bytes overhead + 255 payload).
pub const DEFAULT_MAX_BURST: usize = 261;

/// Smallest usable burst cap: a frame with an empty payload.
pub const MIN_BURST: usize = 6;

const READ_CHUNK_SIZE: usize = 64;

/// Configuration for byte-stream links.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Silence after the last received byte that closes a burst.
    pub idle_gap: Duration,
    /// Bytes after which a burst is handed over even without silence.
    /// Values below [`MIN_BURST`] are raised to it.
    pub max_burst: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_gap: DEFAULT_IDLE_GAP,
            max_burst: DEFAULT_MAX_BURST,
        }
    }
}

/// Serial-style link over any `Read + Write` byte stream.
///
/// The underlying stream must return from `read` with `WouldBlock` or
/// `TimedOut` after a short wait (a serial port read timeout, or a socket
/// read timeout no longer than `idle_gap`); a stream that blocks forever
/// will block `receive` forever.
pub struct StreamLink<T> {
    inner: T,
    buf: BytesMut,
    config: StreamConfig,
}

impl<T: Read + Write> StreamLink<T> {
    /// Create a stream link with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, StreamConfig::default())
    }

    /// Create a stream link with explicit configuration.
    pub fn with_config(inner: T, mut config: StreamConfig) -> Self {
        config.max_burst = config.max_burst.max(MIN_BURST);
        Self {
            inner,
            buf: BytesMut::with_capacity(config.max_burst),
            config,
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the link and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current link configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    fn take_burst(&mut self) -> Bytes {
        let burst = self.buf.split().freeze();
        trace!(len = burst.len(), "burst complete");
        burst
    }
}

impl<T: Read + Write> BusLink for StreamLink<T> {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < frame.len() {
            match self.inner.write(&frame[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Bytes>> {
        let started = Instant::now();
        let mut last_byte: Option<Instant> = None;
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            if self.buf.len() >= self.config.max_burst {
                debug!(len = self.buf.len(), "burst cap reached without silence");
                return Ok(Some(self.take_burst()));
            }

            let room = (self.config.max_burst - self.buf.len()).min(READ_CHUNK_SIZE);
            match self.inner.read(&mut chunk[..room]) {
                Ok(0) => {
                    if self.buf.is_empty() {
                        return Err(TransportError::Closed);
                    }
                    return Ok(Some(self.take_burst()));
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    last_byte = Some(Instant::now());
                    continue;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(err) => return Err(TransportError::Io(err)),
            }

            match last_byte {
                Some(at) if at.elapsed() >= self.config.idle_gap => {
                    return Ok(Some(self.take_burst()));
                }
                Some(_) => {}
                None if started.elapsed() >= timeout => return Ok(None),
                None => {}
            }
        }
    }
}

impl<T> std::fmt::Debug for StreamLink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamLink")
            .field("buffered", &self.buf.len())
            .field("config", &self.config)
            .finish()
    }
}
