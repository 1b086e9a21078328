//! Two or more replicas converging through a relay

use std::time::Duration;

use driftdb_core::{ActorId, OpId, OpKind, Operation};
use driftdb_crypto::PayloadKey;
use driftdb_relay::{DEFAULT_SEND_TIMEOUT, Frame, Relay, RelayConfig, RelayServer};
use driftdb_storage::MemoryOpLog;
use driftdb_store::{Store, StoreConfig};
use driftdb_sync::{
    ChannelConnection, RelayConnection, SyncClient, SyncCodec, SyncConfig, WsRelayConnection,
    encode,
};

async fn new_store() -> Store {
    Store::open(MemoryOpLog::new(), StoreConfig::default())
        .await
        .unwrap()
}

async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held: {what}");
}

fn op(id: &str, actor: &str, ts: i64, kind: OpKind, key: &str, value: &str) -> Operation {
    Operation::new(
        OpId::from(id),
        ActorId::from(actor),
        ts,
        kind,
        key,
        value.as_bytes().to_vec(),
    )
}

#[tokio::test]
async fn two_nodes_converge_through_in_process_relay() {
    let relay = Relay::default();
    let a = new_store().await;
    let b = new_store().await;
    let live_only = SyncConfig::default().with_publish_history_on_start(false);

    let client_a = SyncClient::spawn(
        a.clone(),
        ChannelConnection::attach(&relay),
        SyncCodec::plaintext(),
        live_only.clone(),
    );
    let client_b = SyncClient::spawn(
        b.clone(),
        ChannelConnection::attach(&relay),
        SyncCodec::plaintext(),
        live_only,
    );

    // Conflicting writes on both sides
    a.apply(op("a1", "A", 100, OpKind::Set, "x", "from-a")).await.unwrap();
    b.apply(op("b1", "B", 200, OpKind::Set, "x", "from-b")).await.unwrap();
    a.apply(op("a2", "A", 500, OpKind::Set, "y", "a")).await.unwrap();
    b.apply(op("b2", "B", 500, OpKind::Set, "y", "b")).await.unwrap();
    a.apply(op("a3", "A", 300, OpKind::Set, "z", "temp")).await.unwrap();
    b.apply(op("b3", "B", 400, OpKind::Delete, "z", "")).await.unwrap();

    eventually("both stores hold six ops", || a.len() == 6 && b.len() == 6).await;

    assert_eq!(a.state(), b.state());
    assert_eq!(a.get("x"), Some(b"from-b".to_vec()));
    assert_eq!(a.get("y"), Some(b"b".to_vec()));
    assert_eq!(a.get("z"), None);

    // Remote ops are not echoed back out
    let stats_a = client_a.shutdown().await;
    let stats_b = client_b.shutdown().await;
    assert_eq!(stats_a.sent, 3);
    assert_eq!(stats_b.sent, 3);
    assert_eq!(stats_a.received, 3);
    assert_eq!(stats_b.received, 3);
}

#[tokio::test]
async fn history_published_on_start() {
    let relay = Relay::default();
    let a = new_store().await;
    let b = new_store().await;

    for i in 0..10 {
        a.apply(op(&format!("h{i}"), "A", i + 1, OpKind::Set, &format!("k{i}"), "v"))
            .await
            .unwrap();
    }
    a.flush().await.unwrap();

    // Attach both before either client starts so the history has a listener
    let conn_a = ChannelConnection::attach(&relay);
    let conn_b = ChannelConnection::attach(&relay);
    let client_b = SyncClient::spawn(b.clone(), conn_b, SyncCodec::plaintext(), SyncConfig::default());
    let client_a = SyncClient::spawn(a.clone(), conn_a, SyncCodec::plaintext(), SyncConfig::default());

    eventually("b catches up", || b.len() == 10).await;
    assert_eq!(a.state(), b.state());
    eventually("history counted", || client_a.stats().history_publishes == 1).await;

    client_a.shutdown().await;
    client_b.shutdown().await;
}

#[tokio::test]
async fn history_larger_than_relay_buffer_converges() {
    let relay = Relay::new(16, DEFAULT_SEND_TIMEOUT);
    let a = new_store().await;
    let b = new_store().await;

    for i in 0..2000 {
        a.apply(op(&format!("bulk{i}"), "A", i + 1, OpKind::Set, &format!("k{}", i % 300), &i.to_string()))
            .await
            .unwrap();
    }
    a.flush().await.unwrap();

    let conn_a = ChannelConnection::attach(&relay);
    let conn_b = ChannelConnection::attach(&relay);
    let client_b = SyncClient::spawn(b.clone(), conn_b, SyncCodec::plaintext(), SyncConfig::default());
    let client_a = SyncClient::spawn(a.clone(), conn_a, SyncCodec::plaintext(), SyncConfig::default());

    eventually("b receives the whole burst", || b.len() == 2000).await;
    assert_eq!(a.state(), b.state());
    assert_eq!(relay.stats().evicted, 0);

    client_a.shutdown().await;
    client_b.shutdown().await;
}

#[tokio::test]
async fn encrypted_peers_converge_and_outsiders_drop() {
    let relay = Relay::default();
    let key = PayloadKey::generate();
    let a = new_store().await;
    let b = new_store().await;
    let outsider = new_store().await;

    let client_a = SyncClient::spawn(
        a.clone(),
        ChannelConnection::attach(&relay),
        SyncCodec::encrypted(key.clone()),
        SyncConfig::default(),
    );
    let client_b = SyncClient::spawn(
        b.clone(),
        ChannelConnection::attach(&relay),
        SyncCodec::encrypted(key),
        SyncConfig::default(),
    );
    let client_outsider = SyncClient::spawn(
        outsider.clone(),
        ChannelConnection::attach(&relay),
        SyncCodec::encrypted(PayloadKey::generate()),
        SyncConfig::default(),
    );

    a.apply(op("1", "A", 10, OpKind::Set, "secret", "42")).await.unwrap();

    eventually("b receives the op", || b.get("secret").is_some()).await;
    eventually("outsider drops the frame", || client_outsider.stats().dropped >= 1).await;

    assert_eq!(b.get("secret"), Some(b"42".to_vec()));
    assert!(outsider.is_empty());

    client_a.shutdown().await;
    client_b.shutdown().await;
    client_outsider.shutdown().await;
}

#[tokio::test]
async fn garbage_frames_are_dropped() {
    let (raw, conn) = ChannelConnection::pair(16);
    let store = new_store().await;
    let client = SyncClient::spawn(
        store.clone(),
        conn,
        SyncCodec::plaintext(),
        SyncConfig::default(),
    );

    raw.send(Frame::Text("{not json".into())).await.unwrap();
    raw.send(Frame::Binary(vec![0xde, 0xad])).await.unwrap();
    let good = op("9", "A", 5, OpKind::Set, "k", "v");
    raw.send(Frame::Binary(encode(&good).unwrap())).await.unwrap();

    eventually("good op applied", || store.get("k").is_some()).await;
    let stats = client.shutdown().await;
    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.received, 1);
}

#[tokio::test]
async fn nodes_converge_over_websocket_relay() {
    let server = RelayServer::bind(RelayConfig::new("127.0.0.1:0".parse().unwrap()))
        .await
        .unwrap();
    let url = format!("ws://{}/", server.local_addr().unwrap());
    let relay = server.relay().clone();
    let shutdown = server.shutdown_handle();
    let server_task = tokio::spawn(server.run());

    let a = new_store().await;
    let b = new_store().await;

    let client_a = SyncClient::spawn(
        a.clone(),
        WsRelayConnection::connect(&url).await.unwrap(),
        SyncCodec::plaintext(),
        SyncConfig::default(),
    );
    let client_b = SyncClient::spawn(
        b.clone(),
        WsRelayConnection::connect(&url).await.unwrap(),
        SyncCodec::plaintext(),
        SyncConfig::default(),
    );
    eventually("relay sees both peers", || relay.peer_count() == 2).await;

    a.apply(op("1", "A", 100, OpKind::Set, "x", "v1")).await.unwrap();
    b.apply(op("2", "B", 200, OpKind::Set, "x", "v2")).await.unwrap();

    eventually("both converge", || a.len() == 2 && b.len() == 2).await;
    assert_eq!(a.get("x"), Some(b"v2".to_vec()));
    assert_eq!(b.get("x"), Some(b"v2".to_vec()));

    client_a.shutdown().await;
    client_b.shutdown().await;
    shutdown.send(()).unwrap();
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn client_stops_when_connection_drops() {
    let (peer, conn) = ChannelConnection::pair(4);
    let store = new_store().await;
    let client = SyncClient::spawn(
        store.clone(),
        conn,
        SyncCodec::plaintext(),
        SyncConfig::default(),
    );

    drop(peer);
    // The next local write finds the link gone and ends the outbound loop
    store
        .apply(op("1", "A", 1, OpKind::Set, "k", "v"))
        .await
        .unwrap();

    eventually("both loops end", || client.is_finished()).await;
    assert_eq!(client.shutdown().await.sent, 0);

    // Local writes keep working without the relay
    store.flush().await.unwrap();
    assert_eq!(store.get("k"), Some(b"v".to_vec()));
}
