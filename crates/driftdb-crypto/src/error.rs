//! Error types for driftdb-crypto

use thiserror::Error;

/// Errors that can occur during payload sealing
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Data too short: expected at least {expected} bytes, got {actual}")]
    DataTooShort { expected: usize, actual: usize },
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_error_display() {
        let err = CryptoError::DecryptionFailed("tag mismatch".to_string());
        assert!(err.to_string().contains("Decryption failed"));

        let err = CryptoError::DataTooShort {
            expected: 12,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("3"));
    }
}
