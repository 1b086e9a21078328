//! The replicated operation
//!
//! An [`Operation`] records one logical write (`set`) or removal (`delete`)
//! of a key. Operations are immutable: once built, they are only compared,
//! selected by the merge rule, persisted, and shipped to peers.
//!
//! ## Wire shape
//!
//! The serde representation is the wire and log format:
//!
//! ```text
//! {"id":"9f..","actor":"A","ts":100,"type":"set","key":"x","value":"djE="}
//! ```
//!
//! `value` is standard padded base64. Unknown fields are ignored when
//! deserializing, and a missing `value` reads as empty.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of random bytes in a generated operation id
const OP_ID_BYTES: usize = 16;

/// Current wall-clock time in nanoseconds since the Unix epoch
pub fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Globally unique operation identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(String);

impl OpId {
    /// Generate a fresh id from the OS random source (lowercase hex)
    pub fn generate() -> Self {
        let mut bytes = [0u8; OP_ID_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OpId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OpId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the device that created an operation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Generate a random actor id (UUID v4)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log output
    pub fn short_id(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of write an operation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// Assign a value to the key
    #[default]
    Set,
    /// Tombstone the key
    Delete,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Set => "set",
            OpKind::Delete => "delete",
        }
    }
}

impl FromStr for OpKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set" => Ok(OpKind::Set),
            "delete" => Ok(OpKind::Delete),
            other => Err(CoreError::InvalidKind(other.to_string())),
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical write or delete, the unit of replication and persistence
///
/// `Operation::default()` is the distinguished empty operation: no id, no
/// actor, timestamp zero. The merge rule treats it as "nothing written yet".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Operation {
    id: OpId,
    actor: ActorId,
    ts: i64,
    #[serde(rename = "type")]
    kind: OpKind,
    key: String,
    #[serde(default, with = "base64_bytes")]
    value: Vec<u8>,
}

impl Operation {
    /// Build an operation from explicit parts
    pub fn new(
        id: OpId,
        actor: ActorId,
        ts: i64,
        kind: OpKind,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id,
            actor,
            ts,
            kind,
            key: key.into(),
            value: value.into(),
        }
    }

    /// A `set` stamped with a fresh id and the current wall clock
    pub fn set(actor: &ActorId, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(
            OpId::generate(),
            actor.clone(),
            now_nanos(),
            OpKind::Set,
            key,
            value,
        )
    }

    /// A `delete` tombstone stamped with a fresh id and the current wall clock
    pub fn delete(actor: &ActorId, key: impl Into<String>) -> Self {
        Self::new(
            OpId::generate(),
            actor.clone(),
            now_nanos(),
            OpKind::Delete,
            key,
            Vec::new(),
        )
    }

    pub fn id(&self) -> &OpId {
        &self.id
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    pub fn ts(&self) -> i64 {
        self.ts
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Whether this is the distinguished empty operation
    pub fn is_empty(&self) -> bool {
        self.ts == 0 && self.id.as_str().is_empty()
    }

    pub fn is_delete(&self) -> bool {
        self.kind == OpKind::Delete
    }

    /// The value this operation leaves behind, `None` for tombstones
    pub fn live_value(&self) -> Option<&[u8]> {
        match self.kind {
            OpKind::Set => Some(&self.value),
            OpKind::Delete => None,
        }
    }
}

/// Serde adapter encoding byte payloads as standard base64 strings
mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
