//! Broadcast core
//!
//! A [`Relay`] owns the set of connected peers. Each peer gets a bounded
//! outbound queue; [`Relay::broadcast`] copies a frame into every queue
//! except the sender's. A full queue pushes back on the sender until the
//! peer catches up. A peer that stays full for longer than the send timeout
//! is disconnected, so one stalled reader cannot stop the relay. The core
//! knows nothing about sockets, so the same instance can serve WebSocket
//! connections and in-process channels.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::frame::Frame;

/// Default bound on how long a broadcast waits for one peer's queue
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Identifier assigned to a peer when it registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl PeerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Point-in-time relay counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Peers currently registered
    pub peers: usize,
    /// Peers registered since the relay was created
    pub registered: u64,
    /// Frame copies handed to peer queues
    pub delivered: u64,
    /// Peers disconnected because their queue stayed full
    pub evicted: u64,
}

#[derive(Debug)]
struct Inner {
    peers: DashMap<PeerId, mpsc::Sender<Frame>>,
    next_id: AtomicU64,
    peer_buffer: usize,
    send_timeout: Duration,
    delivered: AtomicU64,
    evicted: AtomicU64,
}

/// Shared handle to a set of connected peers
#[derive(Debug, Clone)]
pub struct Relay {
    inner: Arc<Inner>,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(256, DEFAULT_SEND_TIMEOUT)
    }
}

impl Relay {
    /// Create a relay whose peers each buffer up to `peer_buffer` frames
    ///
    /// A broadcast waits at most `send_timeout` for a full peer queue
    /// before disconnecting that peer.
    pub fn new(peer_buffer: usize, send_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                peers: DashMap::new(),
                next_id: AtomicU64::new(1),
                peer_buffer: peer_buffer.max(1),
                send_timeout,
                delivered: AtomicU64::new(0),
                evicted: AtomicU64::new(0),
            }),
        }
    }

    /// Add a peer and return its id plus the queue of frames meant for it
    pub fn register(&self) -> (PeerId, mpsc::Receiver<Frame>) {
        let id = PeerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.peer_buffer);
        self.inner.peers.insert(id, tx);
        debug!(peer = %id, peers = self.inner.peers.len(), "Peer registered");
        (id, rx)
    }

    /// Remove a peer; its receiver sees the channel close
    pub fn unregister(&self, peer: PeerId) -> bool {
        let removed = self.inner.peers.remove(&peer).is_some();
        if removed {
            debug!(peer = %peer, peers = self.inner.peers.len(), "Peer unregistered");
        }
        removed
    }

    /// Forward `frame` to every peer other than `from`
    ///
    /// Waits for room in each peer's queue, so a burst larger than the
    /// buffer slows the sender down instead of losing frames. Returns how
    /// many peers the frame was queued for. Peers whose receiver is gone,
    /// or whose queue stays full past the send timeout, are removed.
    pub async fn broadcast(&self, from: PeerId, frame: Frame) -> usize {
        // Senders are cloned out so no map shard lock is held across an await
        let targets: Vec<(PeerId, mpsc::Sender<Frame>)> = self
            .inner
            .peers
            .iter()
            .filter(|entry| *entry.key() != from)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        for (peer, tx) in targets {
            match tokio::time::timeout(self.inner.send_timeout, tx.send(frame.clone())).await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(_)) => {
                    self.unregister(peer);
                }
                Err(_) => {
                    warn!(
                        peer = %peer,
                        timeout_ms = self.inner.send_timeout.as_millis() as u64,
                        "Peer queue stayed full, disconnecting"
                    );
                    if self.unregister(peer) {
                        self.inner.evicted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }

        self.inner
            .delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        trace!(from = %from, bytes = frame.len(), delivered, "Frame relayed");
        delivered
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn is_registered(&self, peer: PeerId) -> bool {
        self.inner.peers.contains_key(&peer)
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            peers: self.inner.peers.len(),
            registered: self.inner.next_id.load(Ordering::Relaxed) - 1,
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            evicted: self.inner.evicted.load(Ordering::Relaxed),
        }
    }
}
