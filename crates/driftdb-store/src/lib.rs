//! # driftdb Store
//!
//! The replicated store engine: a single writer task that deduplicates,
//! persists and folds operations into a queryable projection.
//!
//! ## Pipeline
//!
//! For each queued operation, in order:
//!
//! 1. Discard it if its id was already applied
//! 2. Discard it if it falls at or below the active snapshot cutoff
//! 3. Append it to the [`OpLog`](driftdb_storage::OpLog) under the
//!    configured [`AppendPolicy`]
//! 4. Mark it seen, fold it into the projection and publish it
//!
//! ## Example
//!
//! ```rust,ignore
//! use driftdb_core::{ActorId, Operation};
//! use driftdb_storage::MemoryOpLog;
//! use driftdb_store::{Store, StoreConfig};
//!
//! let store = Store::open(MemoryOpLog::new(), StoreConfig::default()).await?;
//! let actor = ActorId::generate();
//!
//! store.apply(Operation::set(&actor, "greeting", b"hello".to_vec())).await?;
//! store.flush().await?;
//! assert_eq!(store.get("greeting"), Some(b"hello".to_vec()));
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod stats;
pub mod store;

mod view;
mod writer;

pub use config::{AppendPolicy, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use event::{AcceptedOp, ApplyOutcome, Origin};
pub use stats::{StoreStats, StoreStatsSnapshot};
pub use store::Store;
