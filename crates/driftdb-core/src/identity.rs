//! Device identity
//!
//! An identity pairs the actor id stamped on every locally created
//! operation with a 32-byte symmetric key used to seal sync payloads.
//! The key is zeroized on drop.

use std::fmt;

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, CoreResult};
use crate::operation::ActorId;

/// Payload key size (32 bytes, AES-256)
pub const KEY_SIZE: usize = 32;

/// A device's actor id and payload key
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Identity {
    #[zeroize(skip)]
    actor: ActorId,
    key: [u8; KEY_SIZE],
}

impl Identity {
    /// Generate a new identity with a random actor id and key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::rng().fill_bytes(&mut key);
        Self {
            actor: ActorId::generate(),
            key,
        }
    }

    /// Rebuild an identity from stored parts
    pub fn from_parts(actor: ActorId, key: &[u8]) -> CoreResult<Self> {
        let key: [u8; KEY_SIZE] = key.try_into().map_err(|_| {
            CoreError::invalid_identity(format!(
                "expected {} key bytes, got {}",
                KEY_SIZE,
                key.len()
            ))
        })?;
        if actor.as_str().is_empty() {
            return Err(CoreError::invalid_identity("empty actor id"));
        }
        Ok(Self { actor, key })
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// Raw key bytes (use with caution)
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("actor", &self.actor)
            .field("key", &"<redacted>")
            .finish()
    }
}
