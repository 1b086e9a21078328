//! Deterministic last-write-wins conflict resolution
//!
//! The winner between two operations on the same key is the one with the
//! greater `(ts, actor, id)` triple, compared left to right. `actor` and `id`
//! compare lexicographically by bytes. Every replica must use this exact
//! ordering: a replica breaking ties on a different field would diverge
//! permanently on equal-timestamp conflicts.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::operation::Operation;

/// Total order used to pick winners: timestamp, then actor, then id
pub fn precedence(a: &Operation, b: &Operation) -> Ordering {
    a.ts()
        .cmp(&b.ts())
        .then_with(|| a.actor().cmp(b.actor()))
        .then_with(|| a.id().cmp(b.id()))
}

/// Choose the winning operation between two candidates for the same key
///
/// The empty operation loses to anything. When both arguments carry the
/// same `(ts, actor, id)` they are the same operation and `a` is returned.
pub fn merge<'a>(a: &'a Operation, b: &'a Operation) -> &'a Operation {
    if a.is_empty() {
        return b;
    }
    if b.is_empty() {
        return a;
    }

    match precedence(b, a) {
        Ordering::Greater => b,
        Ordering::Less | Ordering::Equal => a,
    }
}

/// Fold `incoming` into `existing` in place
///
/// Returns `true` when `incoming` became the new winner. Starting from
/// `Operation::default()` makes any real operation win.
pub fn merge_into(existing: &mut Operation, incoming: &Operation) -> bool {
    let replace = !std::ptr::eq(merge(existing, incoming), &*existing);
    if replace {
        *existing = incoming.clone();
    }
    replace
}

/// Recompute the winning operation for every key from scratch
pub fn winners<'a, I>(ops: I) -> BTreeMap<String, Operation>
where
    I: IntoIterator<Item = &'a Operation>,
{
    let mut out: BTreeMap<String, Operation> = BTreeMap::new();
    for op in ops {
        merge_into(out.entry(op.key().to_string()).or_default(), op);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{ActorId, OpId, OpKind};

    fn op(id: &str, actor: &str, ts: i64, kind: OpKind, key: &str, value: &str) -> Operation {
        Operation::new(
            OpId::from(id),
            ActorId::from(actor),
            ts,
            kind,
            key,
            value.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_empty_loses() {
        let empty = Operation::default();
        let b = op("1", "A", 10, OpKind::Set, "x", "v");
        assert_eq!(merge(&empty, &b), &b);
        assert_eq!(merge(&b, &empty), &b);
    }

    #[test]
    fn test_later_timestamp_wins() {
        let a = op("1", "A", 100, OpKind::Set, "x", "v1");
        let b = op("2", "B", 200, OpKind::Set, "x", "v2");
        assert_eq!(merge(&a, &b), &b);
        assert_eq!(merge(&b, &a), &b);
    }

    #[test]
    fn test_tie_broken_by_actor() {
        let a = op("z", "A", 500, OpKind::Set, "y", "from-a");
        let b = op("a", "B", 500, OpKind::Set, "y", "from-b");
        // Actor outranks id: "B" wins even though its id is smaller
        assert_eq!(merge(&a, &b), &b);
        assert_eq!(merge(&b, &a), &b);
    }

    #[test]
    fn test_tie_on_actor_broken_by_id() {
        let a = op("1", "A", 500, OpKind::Set, "y", "first");
        let b = op("2", "A", 500, OpKind::Set, "y", "second");
        assert_eq!(merge(&a, &b), &b);
        assert_eq!(merge(&b, &a), &b);
    }

    #[test]
    fn test_merge_idempotent() {
        let a = op("1", "A", 7, OpKind::Delete, "k", "");
        assert_eq!(merge(&a, &a), &a);
    }

    #[test]
    fn test_merge_into() {
        let mut slot = Operation::default();
        let first = op("1", "A", 10, OpKind::Set, "k", "v1");
        let stale = op("0", "A", 5, OpKind::Set, "k", "old");
        let newer = op("2", "A", 20, OpKind::Delete, "k", "");

        assert!(merge_into(&mut slot, &first));
        assert!(!merge_into(&mut slot, &stale));
        assert_eq!(slot, first);
        assert!(merge_into(&mut slot, &newer));
        assert_eq!(slot, newer);
    }

    #[test]
    fn test_winners_per_key() {
        let ops = vec![
            op("1", "A", 100, OpKind::Set, "x", "v1"),
            op("2", "B", 200, OpKind::Set, "x", "v2"),
            op("3", "A", 50, OpKind::Set, "z", "only"),
        ];
        let result = winners(&ops);
        assert_eq!(result.len(), 2);
        assert_eq!(result["x"].value(), b"v2");
        assert_eq!(result["z"].value(), b"only");
    }
}
