//! Read view shared between the writer and readers
//!
//! Only the writer task mutates a [`StoreView`]; readers take a short read
//! lock and clone out what they need.

use std::collections::{BTreeMap, HashMap};

use driftdb_core::{Operation, Snapshot, merge_into, winners};

#[derive(Debug, Default)]
pub(crate) struct StoreView {
    /// Accepted operations in acceptance order
    pub(crate) ops: Vec<Operation>,
    /// Winning operation per key
    pub(crate) projection: HashMap<String, Operation>,
    /// Active snapshot, if any
    pub(crate) snapshot: Option<Snapshot>,
}

impl StoreView {
    /// Record an accepted operation and fold it into the projection
    pub(crate) fn fold(&mut self, op: Operation) {
        merge_into(self.projection.entry(op.key().to_string()).or_default(), &op);
        self.ops.push(op);
    }

    pub(crate) fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.projection
            .get(key)
            .and_then(Operation::live_value)
            .map(<[u8]>::to_vec)
    }

    /// Every key whose winner is a `set`
    pub(crate) fn live_state(&self) -> BTreeMap<String, Vec<u8>> {
        self.projection
            .iter()
            .filter_map(|(key, op)| op.live_value().map(|v| (key.clone(), v.to_vec())))
            .collect()
    }

    /// Live state built only from operations with `ts <= cutoff`
    pub(crate) fn state_at(&self, cutoff: i64) -> BTreeMap<String, Vec<u8>> {
        winners(self.ops.iter().filter(|op| op.ts() <= cutoff))
            .into_iter()
            .filter_map(|(key, op)| op.live_value().map(|v| (key, v.to_vec())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftdb_core::{ActorId, OpId, OpKind};

    fn op(id: &str, ts: i64, kind: OpKind, key: &str, value: &str) -> Operation {
        Operation::new(
            OpId::from(id),
            ActorId::from("A"),
            ts,
            kind,
            key,
            value.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_fold_keeps_winner_and_history() {
        let mut view = StoreView::default();
        view.fold(op("2", 200, OpKind::Set, "x", "new"));
        view.fold(op("1", 100, OpKind::Set, "x", "old"));

        assert_eq!(view.ops.len(), 2);
        assert_eq!(view.get("x"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_state_at_ignores_later_ops() {
        let mut view = StoreView::default();
        view.fold(op("1", 100, OpKind::Set, "x", "old"));
        view.fold(op("2", 200, OpKind::Set, "x", "new"));
        view.fold(op("3", 120, OpKind::Set, "y", "v"));
        view.fold(op("4", 180, OpKind::Delete, "y", ""));
        view.fold(op("5", 300, OpKind::Set, "z", "later"));

        let state = view.state_at(150);
        assert_eq!(state.len(), 2);
        assert_eq!(state["x"], b"old".to_vec());
        assert_eq!(state["y"], b"v".to_vec());
        assert_eq!(view.get("x"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_delete_hides_key() {
        let mut view = StoreView::default();
        view.fold(op("1", 100, OpKind::Set, "x", "v"));
        view.fold(op("2", 200, OpKind::Delete, "x", ""));

        assert_eq!(view.get("x"), None);
        assert!(view.live_state().is_empty());
        // The tombstone stays in the projection
        assert!(view.projection["x"].is_delete());
    }
}
