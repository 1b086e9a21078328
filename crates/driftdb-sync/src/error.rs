//! Error types for driftdb-sync

use thiserror::Error;

use driftdb_store::StoreError;

/// Errors that can occur while syncing with a relay
#[derive(Debug, Error)]
pub enum SyncError {
    /// A payload could not be encoded for the wire
    #[error("Encode error: {0}")]
    Encode(String),

    /// A received payload was not a valid operation
    #[error("Decode error: {0}")]
    Decode(String),

    /// Could not connect to the relay
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The relay connection is closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Sending a frame failed
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Receiving a frame failed
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The local store rejected a command
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::SendFailed(message.into())
    }

    pub fn receive_failed(message: impl Into<String>) -> Self {
        Self::ReceiveFailed(message.into())
    }

    /// Whether the connection can no longer be used
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::ConnectionFailed(_) | Self::ReceiveFailed(_)
        )
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts() {
        let err: SyncError = StoreError::Closed.into();
        assert!(matches!(err, SyncError::Store(StoreError::Closed)));
        assert!(!err.is_disconnect());
    }

    #[test]
    fn test_disconnect_classification() {
        assert!(SyncError::ConnectionClosed.is_disconnect());
        assert!(SyncError::receive_failed("reset").is_disconnect());
        assert!(!SyncError::decode("bad json").is_disconnect());
        assert!(!SyncError::send_failed("broken pipe").is_disconnect());
    }
}
