//! Operation wire encoding
//!
//! One operation per message, as a JSON object with a fixed field order:
//!
//! ```text
//! {"id":"..","actor":"..","ts":1700000000000000000,"type":"set","key":"x","value":"djE="}
//! ```
//!
//! `value` is standard padded base64. Unknown fields are ignored so newer
//! peers can add fields without breaking older ones.

use driftdb_core::Operation;

use crate::error::{SyncError, SyncResult};

/// Encode an operation as JSON bytes
pub fn encode(op: &Operation) -> SyncResult<Vec<u8>> {
    serde_json::to_vec(op).map_err(|e| SyncError::Encode(e.to_string()))
}

/// Decode an operation from JSON bytes
///
/// Rejects anything that is not a well-formed operation, including the
/// empty operation and operations without an id.
pub fn decode(data: &[u8]) -> SyncResult<Operation> {
    let op: Operation =
        serde_json::from_slice(data).map_err(|e| SyncError::decode(e.to_string()))?;

    if op.id().as_str().is_empty() {
        return Err(SyncError::decode("operation has no id"));
    }
    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftdb_core::{ActorId, OpId, OpKind};

    #[test]
    fn test_encode_field_order() {
        let op = Operation::new(
            OpId::from("1"),
            ActorId::from("A"),
            100,
            OpKind::Set,
            "x",
            b"v1".to_vec(),
        );
        let encoded = String::from_utf8(encode(&op).unwrap()).unwrap();
        assert_eq!(
            encoded,
            r#"{"id":"1","actor":"A","ts":100,"type":"set","key":"x","value":"djE="}"#
        );
        assert_eq!(decode(encoded.as_bytes()).unwrap(), op);
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let data = br#"{"id":"7","actor":"B","ts":5,"type":"delete","key":"k","value":"","hops":3}"#;
        let op = decode(data).unwrap();
        assert!(op.is_delete());
        assert_eq!(op.id().as_str(), "7");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(b"").is_err());
        assert!(decode(b"not json").is_err());
        assert!(decode(br#"{"id":"1","actor":"A","ts":1,"type":"rename","key":"k"}"#).is_err());
        assert!(decode(br#"{"id":"","actor":"","ts":0,"type":"set","key":""}"#).is_err());
    }
}
