//! Message-oriented connection to a relay
//!
//! The [`RelayConnection`] trait lets the sync client run unchanged over a
//! real WebSocket or over in-process channels.
//!
//! ## Implementations
//!
//! - [`ChannelConnection`]: `mpsc` pairs, either point-to-point or attached
//!   to an in-process [`Relay`] (in this module)
//! - [`WsRelayConnection`](crate::WsRelayConnection): WebSocket client

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use driftdb_relay::{Frame, Relay};

use crate::error::{SyncError, SyncResult};

/// A bidirectional, message-oriented link to the relay
#[async_trait]
pub trait RelayConnection: Send + Sync {
    /// Send one frame to the relay
    async fn send(&self, frame: Frame) -> SyncResult<()>;

    /// Wait for the next frame from the relay
    ///
    /// Returns [`SyncError::ConnectionClosed`] once the link is gone.
    async fn recv(&self) -> SyncResult<Frame>;

    /// Close the link; default does nothing
    async fn close(&self) -> SyncResult<()> {
        Ok(())
    }
}

/// In-memory connection built on `mpsc` channels
#[derive(Debug)]
pub struct ChannelConnection {
    tx: mpsc::Sender<Frame>,
    rx: Mutex<mpsc::Receiver<Frame>>,
}

impl ChannelConnection {
    /// Two connections wired to each other
    pub fn pair(buffer: usize) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::channel(buffer.max(1));
        let (b_tx, b_rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                tx: a_tx,
                rx: Mutex::new(b_rx),
            },
            Self {
                tx: b_tx,
                rx: Mutex::new(a_rx),
            },
        )
    }

    /// Register with an in-process relay as a new peer
    ///
    /// Must be called inside a tokio runtime. The peer is unregistered when
    /// the connection is dropped.
    pub fn attach(relay: &Relay) -> Self {
        let (peer, from_relay) = relay.register();
        let (tx, mut to_relay) = mpsc::channel::<Frame>(64);

        let relay = relay.clone();
        tokio::spawn(async move {
            while let Some(frame) = to_relay.recv().await {
                relay.broadcast(peer, frame).await;
            }
            relay.unregister(peer);
            debug!(%peer, "In-process peer detached");
        });

        Self {
            tx,
            rx: Mutex::new(from_relay),
        }
    }
}

#[async_trait]
impl RelayConnection for ChannelConnection {
    async fn send(&self, frame: Frame) -> SyncResult<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| SyncError::ConnectionClosed)
    }

    async fn recv(&self) -> SyncResult<Frame> {
        self.rx
            .lock()
            .await
            .recv()
            .await
            .ok_or(SyncError::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftdb_relay::DEFAULT_SEND_TIMEOUT;

    #[tokio::test]
    async fn test_pair_is_bidirectional() {
        let (a, b) = ChannelConnection::pair(4);
        a.send(Frame::Text("ping".into())).await.unwrap();
        b.send(Frame::Binary(vec![1])).await.unwrap();

        assert_eq!(b.recv().await.unwrap(), Frame::Text("ping".into()));
        assert_eq!(a.recv().await.unwrap(), Frame::Binary(vec![1]));
    }

    #[tokio::test]
    async fn test_dropped_peer_closes() {
        let (a, b) = ChannelConnection::pair(4);
        drop(b);
        assert!(matches!(a.recv().await, Err(SyncError::ConnectionClosed)));
        assert!(matches!(
            a.send(Frame::Text("x".into())).await,
            Err(SyncError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_attached_peers_do_not_hear_themselves() {
        let relay = Relay::new(16, DEFAULT_SEND_TIMEOUT);
        let a = ChannelConnection::attach(&relay);
        let b = ChannelConnection::attach(&relay);
        assert_eq!(relay.peer_count(), 2);

        a.send(Frame::Text("hi".into())).await.unwrap();
        assert_eq!(b.recv().await.unwrap(), Frame::Text("hi".into()));

        let echoed =
            tokio::time::timeout(std::time::Duration::from_millis(100), a.recv()).await;
        assert!(echoed.is_err());

        drop(b);
        for _ in 0..100 {
            if relay.peer_count() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(relay.peer_count(), 1);
    }
}
