//! Shared payload key
//!
//! AES-256-GCM with a random 96-bit nonce per message. Sealed output is the
//! nonce followed by the ciphertext (which carries the GCM tag). Key bytes
//! are zeroized on drop.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use driftdb_core::{Identity, KEY_SIZE};

use crate::error::{CryptoError, CryptoResult};

/// Nonce size for AES-GCM (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Symmetric key shared by the peers of one replication group
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PayloadKey {
    key: [u8; KEY_SIZE],
}

impl PayloadKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::rng().fill_bytes(&mut key);
        Self { key }
    }

    pub fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Create from a slice, checking its length
    pub fn from_slice(key: &[u8]) -> CryptoResult<Self> {
        let key: [u8; KEY_SIZE] = key.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("expected {} bytes, got {}", KEY_SIZE, key.len()))
        })?;
        Ok(Self { key })
    }

    /// Use the key carried by a device identity
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            key: *identity.key(),
        }
    }

    /// Raw key bytes (use with caution)
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    fn cipher(&self) -> CryptoResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Encrypt a payload, returning `nonce || ciphertext`
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt `nonce || ciphertext` produced by [`encrypt`](Self::encrypt)
    pub fn decrypt(&self, sealed: &[u8]) -> CryptoResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE {
            return Err(CryptoError::DataTooShort {
                expected: NONCE_SIZE,
                actual: sealed.len(),
            });
        }

        let cipher = self.cipher()?;
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);

        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}

impl std::fmt::Debug for PayloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PayloadKey(<redacted>)")
    }
}
