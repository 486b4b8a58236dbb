//! Sensor-node side of the tmon bus.
//!
//! A node owns one address and a [`ReadingSource`]. The [`Dispatcher`] turns
//! each received burst into either a REPLY frame or nothing; the [`Node`]
//! runtime drives a dispatcher over any [`BusLink`](tmonbus_transport::BusLink).

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod node;
pub mod source;

pub use config::NodeConfig;
pub use dispatcher::{process, Dispatcher};
pub use error::{NodeError, Result};
pub use node::{Node, NodeStats};
pub use source::{from_fn, FixedReadings, FnSource, ReadingSource, SimulatedSource};
