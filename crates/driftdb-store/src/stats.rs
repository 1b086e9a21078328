//! Store counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the writer task
#[derive(Debug, Default)]
pub struct StoreStats {
    applied: AtomicU64,
    replayed: AtomicU64,
    duplicates: AtomicU64,
    compacted: AtomicU64,
    append_retries: AtomicU64,
    append_failures: AtomicU64,
}

/// Point-in-time copy of [`StoreStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    /// Operations accepted through the apply path
    pub applied: u64,
    /// Operations restored from the durable log at startup
    pub replayed: u64,
    /// Operations discarded because their id was already seen
    pub duplicates: u64,
    /// Operations discarded by the snapshot cutoff
    pub compacted: u64,
    /// Append attempts that failed and were retried
    pub append_retries: u64,
    /// Operations whose append failed on every attempt
    pub append_failures: u64,
}

impl StoreStats {
    pub(crate) fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_replayed(&self) {
        self.replayed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compacted(&self) {
        self.compacted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.append_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_append_failure(&self) {
        self.append_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            compacted: self.compacted.load(Ordering::Relaxed),
            append_retries: self.append_retries.load(Ordering::Relaxed),
            append_failures: self.append_failures.load(Ordering::Relaxed),
        }
    }
}
