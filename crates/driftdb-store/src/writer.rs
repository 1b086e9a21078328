//! The single writer task
//!
//! All mutation of a store happens here. Commands arrive over a bounded
//! `mpsc` queue and are processed one at a time, in order, so `seen`, the
//! log handle and the read view never see concurrent writers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use driftdb_core::{OpId, Operation, Snapshot, now_nanos};
use driftdb_storage::{OpLog, StorageError};

use crate::config::AppendPolicy;
use crate::error::{StoreError, StoreResult};
use crate::event::{AcceptedOp, ApplyOutcome, Origin};
use crate::stats::StoreStats;
use crate::view::StoreView;

pub(crate) type Ack<T> = oneshot::Sender<T>;

/// Commands sent from [`Store`](crate::Store) handles to the writer
pub(crate) enum Command {
    Apply {
        op: Operation,
        origin: Origin,
        /// Present for strict-durability callers waiting on the outcome
        ack: Option<Ack<StoreResult<ApplyOutcome>>>,
    },
    Flush {
        ack: Ack<()>,
    },
    Snapshot {
        cutoff: Option<i64>,
        ack: Ack<Snapshot>,
    },
    Shutdown {
        ack: Ack<()>,
    },
}

pub(crate) struct Writer {
    log: Box<dyn OpLog>,
    /// Applied op ids with their timestamps, pruned on snapshot
    seen: HashMap<OpId, i64>,
    /// Cutoff of the active snapshot
    cutoff: Option<i64>,
    view: Arc<RwLock<StoreView>>,
    events: broadcast::Sender<AcceptedOp>,
    stats: Arc<StoreStats>,
    policy: AppendPolicy,
}

impl Writer {
    pub(crate) fn new(
        log: Box<dyn OpLog>,
        view: Arc<RwLock<StoreView>>,
        events: broadcast::Sender<AcceptedOp>,
        stats: Arc<StoreStats>,
        policy: AppendPolicy,
    ) -> Self {
        Self {
            log,
            seen: HashMap::new(),
            cutoff: None,
            view,
            events,
            stats,
            policy,
        }
    }

    /// Rebuild state from operations loaded out of the durable log
    ///
    /// Nothing is re-appended and nothing is published. Returns how many
    /// operations were accepted.
    pub(crate) fn replay(&mut self, history: Vec<Operation>) -> usize {
        let mut view = self.view.write();
        let mut accepted = 0;
        for op in history {
            if self.seen.contains_key(op.id()) {
                // Retried appends can leave the same op in the log twice
                continue;
            }
            self.seen.insert(op.id().clone(), op.ts());
            view.fold(op);
            self.stats.record_replayed();
            accepted += 1;
        }
        accepted
    }

    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        debug!(backend = self.log.kind(), "Store writer started");

        let mut shutdown_ack = None;
        while let Some(command) = rx.recv().await {
            if let Command::Shutdown { ack } = command {
                shutdown_ack = Some(ack);
                break;
            }
            self.handle(command).await;
        }

        // Refuse new input, then drain whatever was already queued
        rx.close();
        let mut drained = 0usize;
        while let Some(command) = rx.recv().await {
            match command {
                Command::Shutdown { ack } => {
                    let _ = ack.send(());
                }
                other => {
                    self.handle(other).await;
                    drained += 1;
                }
            }
        }

        if let Err(e) = self.log.flush().await {
            error!(error = %e, "Failed to flush operation log on shutdown");
        }

        info!(drained, ops = self.view.read().ops.len(), "Store writer stopped");

        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Apply { op, origin, ack } => {
                let strict = ack.is_some();
                let result = self.process(op, origin, strict).await;
                match ack {
                    Some(ack) => {
                        let _ = ack.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            error!(error = %e, "Apply failed");
                        }
                    }
                }
            }
            Command::Flush { ack } => {
                let _ = ack.send(());
            }
            Command::Snapshot { cutoff, ack } => {
                let _ = ack.send(self.take_snapshot(cutoff));
            }
            Command::Shutdown { ack } => {
                let _ = ack.send(());
            }
        }
    }

    /// Run one operation through dedup, cutoff, append and fold
    async fn process(
        &mut self,
        op: Operation,
        origin: Origin,
        strict: bool,
    ) -> StoreResult<ApplyOutcome> {
        if self.seen.contains_key(op.id()) {
            trace!(op_id = %op.id(), "Discarding duplicate operation");
            self.stats.record_duplicate();
            return Ok(ApplyOutcome::Duplicate);
        }

        if let Some(cutoff) = self.cutoff {
            if op.ts() <= cutoff {
                trace!(op_id = %op.id(), ts = op.ts(), cutoff, "Discarding compacted operation");
                self.stats.record_compacted();
                return Ok(ApplyOutcome::Compacted);
            }
        }

        if let Err(e) = self.append_with_retry(&op).await {
            self.stats.record_append_failure();
            if strict {
                error!(op_id = %op.id(), error = %e, "Append failed, operation rejected");
                return Err(StoreError::Durability(e));
            }
            error!(
                op_id = %op.id(),
                error = %e,
                "Append failed, folding operation without durability"
            );
        }

        self.accept(op, origin);
        Ok(ApplyOutcome::Applied)
    }

    fn accept(&mut self, op: Operation, origin: Origin) {
        self.seen.insert(op.id().clone(), op.ts());
        self.view.write().fold(op.clone());
        self.stats.record_applied();

        debug!(op_id = %op.id(), key = op.key(), ?origin, "Applied operation");

        // No subscribers is fine
        let _ = self.events.send(AcceptedOp { op, origin });
    }

    async fn append_with_retry(&mut self, op: &Operation) -> Result<(), StorageError> {
        let attempts = self.policy.attempts();
        let mut failures = 0u32;

        loop {
            let result =
                match tokio::time::timeout(self.policy.attempt_timeout, self.log.append(op)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(StorageError::unavailable(format!(
                        "append timed out after {:?}",
                        self.policy.attempt_timeout
                    ))),
                };

            let err = match result {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            failures += 1;
            if failures >= attempts {
                return Err(err);
            }

            let backoff = self.policy.backoff_for(failures);
            self.stats.record_retry();
            warn!(
                op_id = %op.id(),
                attempt = failures,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "Append failed, retrying"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    /// Materialize the state as of the cutoff and install it as the active
    /// snapshot
    ///
    /// Cutoffs never move backwards: a request below the active cutoff is
    /// raised to it, so ids pruned from `seen` stay covered.
    fn take_snapshot(&mut self, requested: Option<i64>) -> Snapshot {
        let requested = requested.unwrap_or_else(now_nanos);
        let cutoff = self.cutoff.map_or(requested, |active| active.max(requested));

        let snapshot = {
            let mut view = self.view.write();
            let snapshot = Snapshot::new(cutoff, view.state_at(cutoff));
            view.snapshot = Some(snapshot.clone());
            snapshot
        };
        self.cutoff = Some(cutoff);

        let before = self.seen.len();
        self.seen.retain(|_, ts| *ts > cutoff);

        info!(
            cutoff,
            keys = snapshot.len(),
            pruned = before - self.seen.len(),
            "Snapshot taken"
        );
        snapshot
    }
}
