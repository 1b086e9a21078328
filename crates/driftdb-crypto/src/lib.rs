//! # driftdb Crypto
//!
//! Symmetric payload sealing for sync traffic.
//!
//! Peers sharing a [`PayloadKey`] can read each other's operations; the
//! relay only ever sees `nonce || ciphertext`.

pub mod error;
pub mod payload_key;

pub use error::{CryptoError, CryptoResult};
pub use payload_key::{NONCE_SIZE, PayloadKey};
