//! # driftdb Core
//!
//! Core types for the driftdb replicated key-value store.
//!
//! Every replica keeps an append-only log of [`Operation`]s and folds it
//! through [`merge`] to obtain the latest value per key. Because the merge
//! rule is commutative and idempotent, replicas that have received the same
//! set of operations converge to the same state regardless of delivery order.
//!
//! ## Key Types
//!
//! - [`Operation`]: an immutable `set` or `delete` record, the unit of replication
//! - [`OpId`] / [`ActorId`]: operation and device identifiers
//! - [`Identity`]: a device's actor id plus its payload encryption key
//! - [`Snapshot`]: materialized state as of a timestamp cutoff
//!
//! ## Merge Rule
//!
//! Last-write-wins on `ts`, ties broken by `actor` and then by `id`:
//!
//! ```rust
//! use driftdb_core::{merge, ActorId, OpId, OpKind, Operation};
//!
//! let a = Operation::new(OpId::from("1"), ActorId::from("A"), 500, OpKind::Set, "y", b"a".to_vec());
//! let b = Operation::new(OpId::from("2"), ActorId::from("B"), 500, OpKind::Set, "y", b"b".to_vec());
//!
//! assert_eq!(merge(&a, &b), &b);
//! assert_eq!(merge(&b, &a), &b);
//! ```

pub mod error;
pub mod identity;
pub mod merge;
pub mod operation;
pub mod snapshot;

pub use error::{CoreError, CoreResult};
pub use identity::{Identity, KEY_SIZE};
pub use merge::{merge, merge_into, precedence, winners};
pub use operation::{ActorId, OpId, OpKind, Operation, now_nanos};
pub use snapshot::Snapshot;
