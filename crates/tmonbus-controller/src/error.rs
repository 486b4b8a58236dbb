use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in controller operations.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] tmonbus_transport::TransportError),

    /// The reply could not be decoded.
    #[error("frame error: {0}")]
    Frame(#[from] tmonbus_frame::FrameError),

    /// The node did not answer in time.
    #[error("node {address} did not reply within {timeout:?}")]
    Timeout { address: u8, timeout: Duration },

    /// A valid frame arrived from the wrong node.
    #[error("reply address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: u8, actual: u8 },

    /// A valid frame arrived that is not a REPLY.
    #[error("unexpected command 0x{command:02X} from node {address}")]
    UnexpectedCommand { address: u8, command: u8 },

    /// A node address outside 1-247.
    #[error("invalid node address {0} (must be 1-247)")]
    InvalidAddress(u8),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The reading store failed.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The directory for the reading store could not be created.
    #[error("failed to create storage directory {path}: {source}")]
    StorageDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ControllerError {
    /// True for failures that only concern the polled node (silence or a bad
    /// answer), as opposed to a broken link or configuration.
    pub fn is_node_failure(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Frame(_)
                | Self::AddressMismatch { .. }
                | Self::UnexpectedCommand { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;
