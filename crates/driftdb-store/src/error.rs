//! Error types for driftdb-store

use thiserror::Error;

use driftdb_storage::StorageError;

/// Errors returned by [`Store`](crate::Store) operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable log could not be read at startup
    #[error("Failed to load operation log: {0}")]
    Load(StorageError),

    /// An operation could not be persisted after every retry
    #[error("Durability failure: {0}")]
    Durability(StorageError),

    /// The writer task has stopped and no longer accepts commands
    #[error("Store is closed")]
    Closed,

    /// The writer task panicked or was cancelled
    #[error("Writer task failed: {0}")]
    Writer(String),
}

impl StoreError {
    /// Create a new Writer error
    pub fn writer(message: impl Into<String>) -> Self {
        Self::Writer(message.into())
    }

    /// Whether this error means the store will never accept input again
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed | Self::Writer(_))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
