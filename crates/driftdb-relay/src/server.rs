//! WebSocket front end for a [`Relay`]
//!
//! Every accepted connection is upgraded to a WebSocket on any path,
//! registered with the relay, and served by two loops: a reader that feeds
//! incoming data frames into [`Relay::broadcast`], and a writer that drains
//! the peer's outbound queue onto the socket.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, instrument, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::frame::Frame;
use crate::relay::Relay;

/// A bound relay server
pub struct RelayServer {
    listener: TcpListener,
    relay: Relay,
    shutdown_tx: broadcast::Sender<()>,
}

impl RelayServer {
    /// Bind the listener described by `config`
    #[instrument(skip_all, fields(addr = %config.bind_addr))]
    pub async fn bind(config: RelayConfig) -> RelayResult<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|e| RelayError::bind(config.bind_addr, e))?;
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(local_addr = ?listener.local_addr().ok(), "Relay listening");

        Ok(Self {
            listener,
            relay: Relay::new(config.peer_buffer, config.send_timeout),
            shutdown_tx,
        })
    }

    /// Address actually bound, useful when binding port 0
    pub fn local_addr(&self) -> RelayResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The broadcast core behind this server
    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Sender that stops the server and closes every connection
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Accept connections until a shutdown signal arrives
    pub async fn run(self) -> RelayResult<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, remote)) => {
                            let relay = self.relay.clone();
                            let shutdown_rx = self.shutdown_tx.subscribe();
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, remote, relay, shutdown_rx).await {
                                    warn!(%remote, error = %e, "Connection ended with error");
                                }
                            });
                        }
                        Err(e) => {
                            // Transient, e.g. EMFILE
                            error!(error = %e, "Accept failed");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!(peers = self.relay.peer_count(), "Relay shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[instrument(skip(stream, relay, shutdown_rx))]
async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    relay: Relay,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> RelayResult<()> {
    let ws = accept_async(stream)
        .await
        .map_err(|e| RelayError::handshake(e.to_string()))?;
    let (mut sink, mut stream) = ws.split();

    let (peer, mut outbound) = relay.register();
    info!(%peer, "Peer connected");

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = sink.send(Message::from(frame)).await {
                debug!(error = %e, "Write to peer failed");
                break;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(message)) => {
                        if message.is_close() {
                            break;
                        }
                        if let Some(frame) = Frame::from_message(message) {
                            relay.broadcast(peer, frame).await;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%peer, error = %e, "Read from peer failed");
                        break;
                    }
                    None => break,
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    // Dropping the peer's sender lets the writer send a close frame and exit
    relay.unregister(peer);
    let _ = writer.await;
    info!(%peer, "Peer disconnected");
    Ok(())
}
