//! Error types for driftdb-cli

use thiserror::Error;

/// Errors raised by CLI helpers
#[derive(Debug, Error)]
pub enum CliError {
    /// Identity files could not be read or written
    #[error("Keystore error: {0}")]
    Keystore(String),

    /// A command-line argument had an invalid value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    pub fn keystore(message: impl Into<String>) -> Self {
        Self::Keystore(message.into())
    }
}

/// Result type for CLI helpers
pub type CliResult<T> = Result<T, CliError>;
