//! Compaction snapshot
//!
//! A snapshot materializes the live key/value state as of a timestamp
//! cutoff. While a store holds a snapshot it ignores operations stamped at
//! or before `last_timestamp`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Materialized state as of a timestamp cutoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Operations with `ts <= last_timestamp` are considered compacted
    pub last_timestamp: i64,
    /// Live value per key, considering only operations up to the cutoff
    pub state: BTreeMap<String, Vec<u8>>,
}

impl Snapshot {
    pub fn new(last_timestamp: i64, state: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            last_timestamp,
            state,
        }
    }

    /// Whether an operation stamped `ts` falls inside the compacted range
    pub fn covers(&self, ts: i64) -> bool {
        ts <= self.last_timestamp
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_is_inclusive() {
        let snap = Snapshot::new(100, BTreeMap::new());
        assert!(snap.covers(99));
        assert!(snap.covers(100));
        assert!(!snap.covers(101));
        assert!(snap.is_empty());
    }
}
