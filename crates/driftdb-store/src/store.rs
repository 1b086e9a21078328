//! Store handle

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use driftdb_core::{Operation, Snapshot};
use driftdb_storage::OpLog;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::event::{AcceptedOp, ApplyOutcome, Origin};
use crate::stats::{StoreStats, StoreStatsSnapshot};
use crate::view::StoreView;
use crate::writer::{Command, Writer};

/// Handle to a replicated key-value store
///
/// Cheap to clone; every clone talks to the same writer task. Writes are
/// queued to the writer, reads are served from a shared view that trails
/// the queue by whatever has not been processed yet. Use [`Store::flush`]
/// to wait for earlier writes to become visible.
#[derive(Clone)]
pub struct Store {
    tx: mpsc::Sender<Command>,
    view: Arc<RwLock<StoreView>>,
    events: broadcast::Sender<AcceptedOp>,
    stats: Arc<StoreStats>,
    writer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("closed", &self.tx.is_closed())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl Store {
    /// Load the log, replay it and start the writer task
    ///
    /// Replayed operations are not appended again and are not published to
    /// subscribers. A load failure is returned as [`StoreError::Load`].
    #[instrument(skip_all, fields(backend = log.kind()))]
    pub async fn open<L>(log: L, config: StoreConfig) -> StoreResult<Self>
    where
        L: OpLog + 'static,
    {
        let history = log.load().await.map_err(StoreError::Load)?;
        let loaded = history.len();

        let view = Arc::new(RwLock::new(StoreView::default()));
        let stats = Arc::new(StoreStats::default());
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let mut writer = Writer::new(
            Box::new(log),
            Arc::clone(&view),
            events.clone(),
            Arc::clone(&stats),
            config.append.clone(),
        );
        let replayed = writer.replay(history);

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let handle = tokio::spawn(writer.run(rx));

        info!(loaded, replayed, "Store opened");

        Ok(Self {
            tx,
            view,
            events,
            stats,
            writer: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Queue a locally created operation
    ///
    /// Returns once the writer has the operation; it becomes visible to
    /// readers shortly after. Append failures are logged and counted, and
    /// the operation is still folded.
    pub async fn apply(&self, op: Operation) -> StoreResult<()> {
        self.enqueue(op, Origin::Local).await
    }

    /// Queue an operation received from another replica
    ///
    /// Identical to [`Store::apply`] except that subscribers see it tagged
    /// [`Origin::Remote`], so sync does not send it back out.
    pub async fn apply_remote(&self, op: Operation) -> StoreResult<()> {
        self.enqueue(op, Origin::Remote).await
    }

    /// Apply a local operation and wait until it is durable
    ///
    /// If the append fails on every attempt the error is returned and the
    /// store is left exactly as it was.
    pub async fn apply_and_wait(&self, op: Operation) -> StoreResult<ApplyOutcome> {
        let (ack, rx) = oneshot::channel();
        self.send(Command::Apply {
            op,
            origin: Origin::Local,
            ack: Some(ack),
        })
        .await?;
        rx.await.map_err(|_| StoreError::Closed)?
    }

    async fn enqueue(&self, op: Operation, origin: Origin) -> StoreResult<()> {
        self.send(Command::Apply {
            op,
            origin,
            ack: None,
        })
        .await
    }

    async fn send(&self, command: Command) -> StoreResult<()> {
        self.tx.send(command).await.map_err(|_| StoreError::Closed)
    }

    /// Wait until every command queued before this call has been processed
    pub async fn flush(&self) -> StoreResult<()> {
        let (ack, rx) = oneshot::channel();
        self.send(Command::Flush { ack }).await?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Current value for `key`, or `None` if unset or deleted
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.view.read().get(key)
    }

    /// Winning operation for `key`, including tombstones
    pub fn winner(&self, key: &str) -> Option<Operation> {
        self.view.read().projection.get(key).cloned()
    }

    /// Every live key and its value
    pub fn state(&self) -> BTreeMap<String, Vec<u8>> {
        self.view.read().live_state()
    }

    /// Accepted operations in acceptance order
    pub fn ops(&self) -> Vec<Operation> {
        self.view.read().ops.clone()
    }

    /// Number of accepted operations
    pub fn len(&self) -> usize {
        self.view.read().ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The active snapshot, if one has been taken
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.view.read().snapshot.clone()
    }

    /// Snapshot the live state with the current wall clock as cutoff
    pub async fn take_snapshot(&self) -> StoreResult<Snapshot> {
        self.request_snapshot(None).await
    }

    /// Snapshot the live state with an explicit cutoff
    ///
    /// Operations with `ts <= cutoff` that arrive afterwards are discarded.
    /// A cutoff below the active one is raised to it.
    pub async fn take_snapshot_at(&self, cutoff: i64) -> StoreResult<Snapshot> {
        self.request_snapshot(Some(cutoff)).await
    }

    async fn request_snapshot(&self, cutoff: Option<i64>) -> StoreResult<Snapshot> {
        let (ack, rx) = oneshot::channel();
        self.send(Command::Snapshot { cutoff, ack }).await?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Subscribe to operations as the writer accepts them
    ///
    /// Only operations accepted after this call are delivered. A receiver
    /// that falls more than `event_capacity` behind gets
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<AcceptedOp> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> StoreStatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether the writer has stopped accepting commands
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Stop the writer after draining queued operations
    ///
    /// Safe to call more than once and from several clones; later calls
    /// return once the writer is gone.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> StoreResult<()> {
        let (ack, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown { ack }).await.is_ok() {
            // The writer may already be draining; a dropped ack is fine
            let _ = rx.await;
        }

        let handle = self.writer.lock().take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| StoreError::writer(e.to_string()))?;
            debug!("Writer task joined");
        }
        Ok(())
    }
}
