//! Background sync with a relay
//!
//! A [`SyncClient`] runs two loops against one [`RelayConnection`]:
//!
//! - **Outbound**: publishes the store's history once on start, then every
//!   locally originated operation the store accepts. Operations that came
//!   from the relay are not sent back.
//! - **Inbound**: opens each frame and feeds it to
//!   [`Store::apply_remote`]. Frames that fail to open are dropped.
//!
//! Delivery is best-effort. Resending is always safe because the store
//! discards duplicate ids.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use driftdb_core::Operation;
use driftdb_relay::Frame;
use driftdb_store::{AcceptedOp, Store};

use crate::codec::SyncCodec;
use crate::connection::RelayConnection;
use crate::error::{SyncError, SyncResult};

/// Sync client configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Send the full local history when the client starts
    pub publish_history_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            publish_history_on_start: true,
        }
    }
}

impl SyncConfig {
    pub fn with_publish_history_on_start(mut self, publish: bool) -> Self {
        self.publish_history_on_start = publish;
        self
    }
}

/// Point-in-time sync counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Frames sent to the relay
    pub sent: u64,
    /// Operations received and handed to the store
    pub received: u64,
    /// Inbound frames dropped because they could not be opened
    pub dropped: u64,
    /// Times the full history was published
    pub history_publishes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    received: AtomicU64,
    dropped: AtomicU64,
    history_publishes: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SyncStats {
        SyncStats {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            history_publishes: self.history_publishes.load(Ordering::Relaxed),
        }
    }
}

/// Handle to the running sync loops
pub struct SyncClient {
    shutdown_tx: broadcast::Sender<()>,
    counters: Arc<Counters>,
    outbound: JoinHandle<()>,
    inbound: JoinHandle<()>,
}

impl SyncClient {
    /// Start syncing `store` through `connection`
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn<C>(store: Store, connection: C, codec: SyncCodec, config: SyncConfig) -> Self
    where
        C: RelayConnection + 'static,
    {
        let encrypted = codec.is_encrypted();
        let connection = Arc::new(connection);
        let counters = Arc::new(Counters::default());
        let (shutdown_tx, _) = broadcast::channel(1);

        // Subscribe before reading history so nothing accepted in between is missed
        let events = store.subscribe();

        let outbound = Outbound {
            store: store.clone(),
            connection: Arc::clone(&connection),
            codec: codec.clone(),
            counters: Arc::clone(&counters),
        };
        let outbound = tokio::spawn(outbound.run(
            events,
            config.publish_history_on_start,
            shutdown_tx.subscribe(),
        ));

        let inbound = Inbound {
            store,
            connection,
            codec,
            counters: Arc::clone(&counters),
        };
        let inbound = tokio::spawn(inbound.run(shutdown_tx.subscribe()));

        info!(
            encrypted,
            publish_history = config.publish_history_on_start,
            "Sync client started"
        );

        Self {
            shutdown_tx,
            counters,
            outbound,
            inbound,
        }
    }

    pub fn stats(&self) -> SyncStats {
        self.counters.snapshot()
    }

    /// Whether both loops have stopped, e.g. after the connection dropped
    pub fn is_finished(&self) -> bool {
        self.outbound.is_finished() && self.inbound.is_finished()
    }

    /// Stop both loops and wait for them
    pub async fn shutdown(self) -> SyncStats {
        let _ = self.shutdown_tx.send(());
        let _ = self.outbound.await;
        let _ = self.inbound.await;
        let stats = self.counters.snapshot();
        info!(
            sent = stats.sent,
            received = stats.received,
            dropped = stats.dropped,
            "Sync client stopped"
        );
        stats
    }
}

struct Outbound<C> {
    store: Store,
    connection: Arc<C>,
    codec: SyncCodec,
    counters: Arc<Counters>,
}

impl<C: RelayConnection + 'static> Outbound<C> {
    async fn run(
        self,
        mut events: broadcast::Receiver<AcceptedOp>,
        publish_history: bool,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        if publish_history && self.publish_history().await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                event = events.recv() => {
                    let result = match event {
                        Ok(accepted) if accepted.is_local() => self.send(&accepted.op).await,
                        Ok(_) => Ok(()),
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "Outbound sync lagged, resending history");
                            self.publish_history().await
                        }
                        Err(RecvError::Closed) => {
                            debug!("Store closed, stopping outbound sync");
                            break;
                        }
                    };
                    if result.is_err() {
                        break;
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("Outbound sync shutting down");
                    break;
                }
            }
        }
    }

    /// Send every accepted operation
    async fn publish_history(&self) -> SyncResult<()> {
        let history = self.store.ops();
        debug!(ops = history.len(), "Publishing history");
        for op in &history {
            self.send(op).await?;
        }
        self.counters.history_publishes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn send(&self, op: &Operation) -> SyncResult<()> {
        let frame = match self.codec.seal(op) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(op_id = %op.id(), error = %e, "Failed to seal operation");
                return Ok(());
            }
        };

        match self.connection.send(frame).await {
            Ok(()) => {
                self.counters.sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) if e.is_disconnect() => {
                warn!(op_id = %op.id(), error = %e, "Relay connection lost, stopping outbound sync");
                Err(e)
            }
            Err(e) => {
                warn!(op_id = %op.id(), error = %e, "Failed to send operation, stopping outbound sync");
                Err(e)
            }
        }
    }
}

struct Inbound<C> {
    store: Store,
    connection: Arc<C>,
    codec: SyncCodec,
    counters: Arc<Counters>,
}

impl<C: RelayConnection + 'static> Inbound<C> {
    async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                received = self.connection.recv() => {
                    let result = match received {
                        Ok(frame) => self.deliver(&frame).await,
                        Err(e) => Err(e),
                    };
                    match result {
                        Ok(()) => {
                            self.counters.received.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(SyncError::Decode(reason)) => {
                            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                            warn!(error = %reason, "Dropping undecodable frame");
                        }
                        Err(e) if e.is_disconnect() => {
                            warn!(error = %e, "Relay connection lost, stopping inbound sync");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "Stopping inbound sync");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("Inbound sync shutting down");
                    break;
                }
            }
        }

        let _ = self.connection.close().await;
    }

    /// Open one frame and hand the operation to the store
    async fn deliver(&self, frame: &Frame) -> SyncResult<()> {
        let op = self.codec.open(frame)?;
        trace!(op_id = %op.id(), "Received operation");
        self.store.apply_remote(op).await?;
        Ok(())
    }
}
