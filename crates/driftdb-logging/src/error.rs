//! Error types for driftdb-logging

use thiserror::Error;

/// Errors that can occur while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A level or filter directive could not be parsed
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// The log directory or file could not be created
    #[error("I/O error: {0}")]
    Io(String),

    /// A global subscriber is already installed
    #[error("Subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

impl From<std::io::Error> for LoggingError {
    fn from(err: std::io::Error) -> Self {
        LoggingError::Io(err.to_string())
    }
}

/// Result type for logging setup
pub type LoggingResult<T> = Result<T, LoggingError>;
