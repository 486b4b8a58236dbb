//! Polled sensor bus protocol for RS-485 and UDP.
//!
//! A controller polls numbered nodes; each node answers with four
//! temperature channels. Every message travels in the same checksummed
//! frame whether the wire is a serial line or a UDP datagram.
//!
//! # Crate Structure
//!
//! - [`transport`]: bus links (UDP, serial-style byte streams, in-memory)
//! - [`frame`]: CRC-16/MODBUS, frame codec and the REPLY payload
//! - [`node`]: POLL dispatch and the node runtime (behind `node` feature)
//! - [`controller`]: polling and push collection (behind `controller` feature)

/// Re-export transport types.
pub mod transport {
    pub use tmonbus_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use tmonbus_frame::*;
}

/// Re-export node types (requires `node` feature).
#[cfg(feature = "node")]
pub mod node {
    pub use tmonbus_node::*;
}

/// Re-export controller types (requires `controller` feature).
#[cfg(feature = "controller")]
pub mod controller {
    pub use tmonbus_controller::*;
}
