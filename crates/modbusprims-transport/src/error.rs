use std::net::SocketAddr;
use std::time::Duration;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the configured local source address.
    #[error("failed to bind source address {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the destination.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on an established connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing arrived before the receive deadline.
    #[error("no data received within {0:?}")]
    Timeout(Duration),

    /// The transport has not been connected, or was closed.
    #[error("transport not connected")]
    NotConnected,

    /// The requested transport kind is not available in this build.
    #[error("unsupported transport: {0}")]
    Unsupported(String),
}

impl TransportError {
    /// True when the error only means the receive window elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
