//! Error types for driftdb-core

use thiserror::Error;

/// Errors raised while constructing core values
#[derive(Debug, Error)]
pub enum CoreError {
    /// Operation type string was neither `set` nor `delete`
    #[error("Invalid operation type: {0}")]
    InvalidKind(String),

    /// Identity material had the wrong shape
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),
}

impl CoreError {
    /// Create a new InvalidIdentity error
    pub fn invalid_identity(message: impl Into<String>) -> Self {
        Self::InvalidIdentity(message.into())
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
