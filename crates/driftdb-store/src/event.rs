//! Values published by the writer

use driftdb_core::Operation;

/// Where an operation entered this replica
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Created or applied by a local caller
    Local,
    /// Received from another replica through sync
    Remote,
}

/// An operation the writer accepted, as seen by subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedOp {
    pub op: Operation,
    pub origin: Origin,
}

impl AcceptedOp {
    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }
}

/// What the writer did with one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Persisted, folded and published
    Applied,
    /// Already in `seen`; discarded
    Duplicate,
    /// At or below the active snapshot cutoff; discarded
    Compacted,
}
