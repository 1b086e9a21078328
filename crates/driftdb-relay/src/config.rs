//! Relay configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::relay::DEFAULT_SEND_TIMEOUT;

/// Configuration for a [`RelayServer`](crate::RelayServer)
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,
    /// Frames buffered per peer before senders have to wait
    pub peer_buffer: usize,
    /// How long a full peer queue may hold up a broadcast before that peer
    /// is disconnected
    pub send_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            peer_buffer: 256,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl RelayConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    pub fn with_peer_buffer(mut self, frames: usize) -> Self {
        self.peer_buffer = frames.max(1);
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}
