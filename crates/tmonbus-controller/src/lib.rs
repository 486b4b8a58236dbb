//! Controller side of the tmon bus.
//!
//! The [`Poller`] walks a list of node addresses, sending a POLL to each and
//! validating the REPLY. The [`PushReceiver`] collects REPLY frames that
//! nodes transmit on their own schedule. Both produce [`Reading`]s, which a
//! [`ReadingSink`] such as [`Storage`] can persist.

pub mod config;
pub mod error;
pub mod poller;
pub mod push;
pub mod reading;
pub mod storage;

pub use config::PollerConfig;
pub use error::{ControllerError, Result};
pub use poller::Poller;
pub use push::PushReceiver;
pub use reading::{fmt_temp, Reading};
pub use storage::{ReadingSink, Storage, StoredReading};
