//! Bus link abstraction.
//!
//! Provides one interface over the ways a tmon frame reaches a node:
//! - UDP datagrams (one datagram carries one frame)
//! - Byte streams such as an RS-485 adapter, where a burst ends at an
//!   inter-byte silence
//! - In-process channel pairs for tests and simulations
//!
//! This is the lowest layer of tmonbus. Links move opaque byte bursts; they
//! know nothing about frame structure.

pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use memory::MemoryLink;
pub use stream::{StreamConfig, StreamLink, DEFAULT_IDLE_GAP, DEFAULT_MAX_BURST, MIN_BURST};
pub use traits::BusLink;
pub use udp::UdpLink;
