use std::net::SocketAddr;

/// Errors that can occur in bus link operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing has been heard yet, so there is nobody to reply to.
    #[error("no peer address known (nothing received yet)")]
    NoPeer,

    /// The socket accepted only part of a datagram.
    #[error("short send to {peer} ({sent} of {len} bytes)")]
    ShortSend {
        peer: SocketAddr,
        sent: usize,
        len: usize,
    },

    /// The other end of the link is gone.
    #[error("link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
