//! WebSocket relay connection

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, instrument, trace};

use driftdb_relay::Frame;

use crate::connection::RelayConnection;
use crate::error::{SyncError, SyncResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client side of a relay WebSocket
///
/// The socket is split so sending and receiving can proceed concurrently
/// from the outbound and inbound sync loops.
pub struct WsRelayConnection {
    url: String,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl std::fmt::Debug for WsRelayConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsRelayConnection")
            .field("url", &self.url)
            .finish()
    }
}

impl WsRelayConnection {
    /// Connect to a relay at `url`, e.g. `ws://127.0.0.1:8080/`
    #[instrument]
    pub async fn connect(url: &str) -> SyncResult<Self> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| SyncError::connection_failed(e.to_string()))?;
        let (sink, stream) = ws.split();

        info!("Connected to relay");

        Ok(Self {
            url: url.to_string(),
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RelayConnection for WsRelayConnection {
    async fn send(&self, frame: Frame) -> SyncResult<()> {
        self.sink
            .lock()
            .await
            .send(Message::from(frame))
            .await
            .map_err(|e| SyncError::send_failed(e.to_string()))
    }

    async fn recv(&self) -> SyncResult<Frame> {
        let mut stream = self.stream.lock().await;
        loop {
            let message = match stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(SyncError::receive_failed(e.to_string())),
                None => return Err(SyncError::ConnectionClosed),
            };

            match message {
                Message::Ping(data) => {
                    trace!("Ping from relay");
                    self.sink
                        .lock()
                        .await
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| SyncError::send_failed(e.to_string()))?;
                }
                Message::Close(_) => {
                    debug!(url = %self.url, "Relay closed the connection");
                    return Err(SyncError::ConnectionClosed);
                }
                other => {
                    if let Some(frame) = Frame::from_message(other) {
                        return Ok(frame);
                    }
                }
            }
        }
    }

    async fn close(&self) -> SyncResult<()> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| SyncError::send_failed(e.to_string()))
    }
}
