//! Error types for driftdb-relay

use thiserror::Error;

/// Errors that can occur while running a relay server
#[derive(Debug, Error)]
pub enum RelayError {
    /// The listener could not be bound
    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// I/O error on the listener
    #[error("I/O error: {0}")]
    Io(String),

    /// WebSocket upgrade failed for an incoming connection
    #[error("Handshake failed: {0}")]
    Handshake(String),
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Io(err.to_string())
    }
}

impl RelayError {
    pub fn bind(addr: impl ToString, reason: impl ToString) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake(message.into())
    }
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
