//! End-to-end relay tests over real WebSocket connections

use std::net::SocketAddr;
use std::time::Duration;

use driftdb_relay::{RelayConfig, RelayServer};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay() -> (SocketAddr, driftdb_relay::Relay, tokio::sync::broadcast::Sender<()>, tokio::task::JoinHandle<()>) {
    let config = RelayConfig::new("127.0.0.1:0".parse().unwrap());
    let server = RelayServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let relay = server.relay().clone();
    let shutdown = server.shutdown_handle();
    let handle = tokio::spawn(async move {
        server.run().await.unwrap();
    });
    (addr, relay, shutdown, handle)
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}{path}")).await.unwrap();
    ws
}

async fn wait_for_peers(relay: &driftdb_relay::Relay, expected: usize) {
    for _ in 0..200 {
        if relay.peer_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {expected} peers, have {}", relay.peer_count());
}

async fn next_data(client: &mut Client) -> Message {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .unwrap();
        if message.is_text() || message.is_binary() {
            return message;
        }
    }
}

#[tokio::test]
async fn frames_reach_everyone_but_the_sender() {
    let (addr, relay, shutdown, handle) = start_relay().await;

    let mut a = connect(addr, "/").await;
    let mut b = connect(addr, "/sync").await;
    let mut c = connect(addr, "/any/path").await;
    wait_for_peers(&relay, 3).await;

    a.send(Message::Text("hello".into())).await.unwrap();
    assert_eq!(next_data(&mut b).await, Message::Text("hello".into()));
    assert_eq!(next_data(&mut c).await, Message::Text("hello".into()));

    // Binary stays binary and is not modified
    c.send(Message::Binary(vec![0, 1, 2, 0xff])).await.unwrap();
    assert_eq!(next_data(&mut a).await, Message::Binary(vec![0, 1, 2, 0xff]));
    assert_eq!(next_data(&mut b).await, Message::Binary(vec![0, 1, 2, 0xff]));

    // The sender never gets its own frame back
    let echoed = tokio::time::timeout(Duration::from_millis(200), a.next()).await;
    assert!(echoed.is_err());

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn disconnected_peers_are_unregistered() {
    let (addr, relay, shutdown, handle) = start_relay().await;

    let mut a = connect(addr, "/").await;
    let b = connect(addr, "/").await;
    wait_for_peers(&relay, 2).await;

    drop(b);
    wait_for_peers(&relay, 1).await;

    a.close(None).await.unwrap();
    wait_for_peers(&relay, 0).await;

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn shutdown_closes_connections() {
    let (addr, relay, shutdown, handle) = start_relay().await;

    let mut a = connect(addr, "/").await;
    wait_for_peers(&relay, 1).await;

    shutdown.send(()).unwrap();
    handle.await.unwrap();
    wait_for_peers(&relay, 0).await;

    // The client sees a close frame or the end of the stream
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match a.next().await {
                None | Some(Err(_)) => break,
                Some(Ok(message)) if message.is_close() => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}
