//! # driftdb Storage
//!
//! Durable operation log backends.
//!
//! The store depends only on the [`OpLog`] capability: append one operation
//! at a time, and reload the whole history in append order on startup.
//! Deduplication is the store's job, so backends accept repeated appends of
//! the same operation.
//!
//! ## Backends
//!
//! - **FileOpLog**: JSON Lines file, one operation per line (reference backend)
//! - **MemoryOpLog**: in-memory log for tests and ephemeral nodes
//!
//! ## Example
//!
//! ```rust,ignore
//! use driftdb_storage::{FileOpLog, FileOpLogConfig, OpLog};
//!
//! let mut log = FileOpLog::open(FileOpLogConfig::new("./data/ops.jsonl")).await?;
//! log.append(&op).await?;
//! let history = log.load().await?;
//! ```

pub mod error;
pub mod file;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::{FileOpLog, FileOpLogConfig};
pub use memory::MemoryOpLog;

use async_trait::async_trait;
use driftdb_core::Operation;

/// Append-only persistence for operations
///
/// Implementations must return operations from [`load`](OpLog::load) in the
/// order they were appended, and return an empty history (not an error)
/// when nothing has been written yet.
#[async_trait]
pub trait OpLog: Send + Sync {
    /// Durably record one operation
    ///
    /// # Errors
    ///
    /// Returns an error if the operation could not be written. Callers may
    /// retry; a retried append of the same operation is harmless.
    async fn append(&mut self, op: &Operation) -> Result<(), StorageError>;

    /// Reload every previously appended operation, in append order
    async fn load(&self) -> Result<Vec<Operation>, StorageError>;

    /// Push buffered writes to stable storage
    ///
    /// Default implementation does nothing.
    async fn flush(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Short backend name for log output
    fn kind(&self) -> &'static str;
}

#[async_trait]
impl<L: OpLog + ?Sized> OpLog for Box<L> {
    async fn append(&mut self, op: &Operation) -> Result<(), StorageError> {
        (**self).append(op).await
    }

    async fn load(&self) -> Result<Vec<Operation>, StorageError> {
        (**self).load().await
    }

    async fn flush(&mut self) -> Result<(), StorageError> {
        (**self).flush().await
    }

    fn kind(&self) -> &'static str {
        (**self).kind()
    }
}
