//! Frame sealing with optional payload encryption

use driftdb_core::Operation;
use driftdb_crypto::PayloadKey;
use driftdb_relay::Frame;

use crate::error::{SyncError, SyncResult};
use crate::protocol::{decode, encode};

/// Turns operations into relay frames and back
///
/// Without a key frames carry the JSON encoding as-is. With a key the JSON
/// is sealed as `nonce || ciphertext` under AES-256-GCM. Either way frames
/// go out as binary; inbound text frames are accepted too.
#[derive(Debug, Clone, Default)]
pub struct SyncCodec {
    key: Option<PayloadKey>,
}

impl SyncCodec {
    pub fn plaintext() -> Self {
        Self { key: None }
    }

    pub fn encrypted(key: PayloadKey) -> Self {
        Self { key: Some(key) }
    }

    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    pub fn seal(&self, op: &Operation) -> SyncResult<Frame> {
        let json = encode(op)?;
        let payload = match &self.key {
            Some(key) => key
                .encrypt(&json)
                .map_err(|e| SyncError::Encode(e.to_string()))?,
            None => json,
        };
        Ok(Frame::Binary(payload))
    }

    /// Recover an operation from a frame
    ///
    /// Decryption failures (wrong key, tampering, plaintext from an
    /// unencrypted peer) are reported as decode errors.
    pub fn open(&self, frame: &Frame) -> SyncResult<Operation> {
        match &self.key {
            Some(key) => {
                let json = key
                    .decrypt(frame.as_bytes())
                    .map_err(|e| SyncError::decode(e.to_string()))?;
                decode(&json)
            }
            None => decode(frame.as_bytes()),
        }
    }
}
