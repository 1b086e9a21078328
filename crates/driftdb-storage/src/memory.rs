//! In-memory operation log
//!
//! Suitable for tests and for nodes that do not need durability. Clones
//! share the same underlying entries, so a test can keep a handle while the
//! store owns another.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use driftdb_core::Operation;

use crate::OpLog;
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Inner {
    entries: Mutex<Vec<Operation>>,
    fail_appends: AtomicBool,
}

/// Shared in-memory operation log
#[derive(Debug, Clone, Default)]
pub struct MemoryOpLog {
    inner: Arc<Inner>,
}

impl MemoryOpLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that already holds `ops`
    pub fn with_ops(ops: Vec<Operation>) -> Self {
        let log = Self::new();
        *log.inner.entries.lock() = ops;
        log
    }

    /// Make subsequent appends fail with [`StorageError::Unavailable`]
    pub fn set_fail_appends(&self, fail: bool) {
        self.inner.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Copy of everything appended so far
    pub fn entries(&self) -> Vec<Operation> {
        self.inner.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }
}

#[async_trait]
impl OpLog for MemoryOpLog {
    async fn append(&mut self, op: &Operation) -> Result<(), StorageError> {
        if self.inner.fail_appends.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("appends disabled"));
        }
        trace!(op_id = %op.id(), "Appended operation to memory log");
        self.inner.entries.lock().push(op.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<Operation>, StorageError> {
        Ok(self.entries())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
