use std::fmt;
use std::io;

use tmonbus_controller::ControllerError;
use tmonbus_frame::FrameError;
use tmonbus_node::NodeError;
use tmonbus_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        io::ErrorKind::NotFound | io::ErrorKind::InvalidInput => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { ref source, .. } | TransportError::Connect { ref source, .. } => {
            let code = match source.kind() {
                io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
                io::ErrorKind::InvalidInput => USAGE,
                _ => TRANSPORT_ERROR,
            };
            CliError::new(code, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    let code = match err {
        FrameError::InvalidFrame(_)
        | FrameError::PayloadTooLarge { .. }
        | FrameError::InvalidReplyLength(_) => DATA_INVALID,
        FrameError::InvalidAddress(_) => USAGE,
        FrameError::BufferTooSmall { .. } => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn node_error(context: &str, err: NodeError) -> CliError {
    match err {
        NodeError::Transport(err) => transport_error(context, err),
        NodeError::Frame(err) => frame_error(context, err),
        NodeError::ConfigRead { source, path } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        NodeError::Json(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other @ (NodeError::InvalidAddress(_) | NodeError::InvalidConfig(_)) => {
            CliError::usage(format!("{context}: {other}"))
        }
    }
}

pub fn controller_error(context: &str, err: ControllerError) -> CliError {
    match err {
        ControllerError::Transport(err) => transport_error(context, err),
        ControllerError::Frame(err) => frame_error(context, err),
        ControllerError::ConfigRead { source, path }
        | ControllerError::StorageDir { source, path } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        ControllerError::Storage(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        ControllerError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ControllerError::AddressMismatch { .. }
        | ControllerError::UnexpectedCommand { .. }
        | ControllerError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ControllerError::InvalidAddress(_) | ControllerError::InvalidConfig(_) => {
            CliError::usage(format!("{context}: {err}"))
        }
    }
}
