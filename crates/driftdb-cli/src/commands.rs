//! Command implementations

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use driftdb_core::{Identity, Operation};
use driftdb_crypto::PayloadKey;
use driftdb_relay::{RelayConfig, RelayServer};
use driftdb_storage::{FileOpLog, FileOpLogConfig};
use driftdb_store::{Store, StoreConfig};
use driftdb_sync::{SyncClient, SyncCodec, SyncConfig, WsRelayConnection, encode};

use crate::config::{Cli, Command};
use crate::error::CliError;
use crate::keystore::Keystore;

/// Name of the operation log inside the data directory
pub const LOG_FILENAME: &str = "ops.jsonl";

/// Run one parsed command, writing user-facing output to `out`
pub async fn run(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    let data_dir = cli.data_dir;
    match cli.command {
        Command::Relay { bind, peer_buffer } => {
            run_relay(RelayConfig::new(bind).with_peer_buffer(peer_buffer)).await
        }
        Command::Set { key, value } => {
            let identity = load_identity(&data_dir)?;
            let op = Operation::set(identity.actor(), key, value.into_bytes());
            write_op(&data_dir, op, out).await
        }
        Command::Delete { key } => {
            let identity = load_identity(&data_dir)?;
            let op = Operation::delete(identity.actor(), key);
            write_op(&data_dir, op, out).await
        }
        Command::Get { key, hex } => {
            let store = open_store(&data_dir).await?;
            match store.get(&key) {
                Some(value) if hex => writeln!(out, "{}", hex::encode(value))?,
                Some(value) => writeln!(out, "{}", String::from_utf8_lossy(&value))?,
                None => writeln!(out, "(not found)")?,
            }
            store.shutdown().await?;
            Ok(())
        }
        Command::State => {
            let store = open_store(&data_dir).await?;
            print_state(&store, out)?;
            store.shutdown().await?;
            Ok(())
        }
        Command::Ops => {
            let store = open_store(&data_dir).await?;
            for op in store.ops() {
                out.write_all(&encode(&op)?)?;
                writeln!(out)?;
            }
            store.shutdown().await?;
            Ok(())
        }
        Command::Snapshot { cutoff } => {
            let store = open_store(&data_dir).await?;
            let snapshot = match cutoff {
                Some(cutoff) => store.take_snapshot_at(cutoff).await?,
                None => store.take_snapshot().await?,
            };
            writeln!(
                out,
                "snapshot at {}: {} keys",
                snapshot.last_timestamp,
                snapshot.len()
            )?;
            for (key, value) in &snapshot.state {
                writeln!(out, "{}={}", key, String::from_utf8_lossy(value))?;
            }
            store.shutdown().await?;
            Ok(())
        }
        Command::Identity => {
            let identity = load_identity(&data_dir)?;
            writeln!(out, "{}", identity.actor())?;
            Ok(())
        }
        Command::Sync {
            relay,
            encrypt,
            key,
        } => {
            let identity = load_identity(&data_dir)?;
            let codec = match (encrypt, key) {
                (false, _) => SyncCodec::plaintext(),
                (true, Some(hex_key)) => SyncCodec::encrypted(parse_key(&hex_key)?),
                (true, None) => SyncCodec::encrypted(PayloadKey::from_identity(&identity)),
            };
            run_sync(&data_dir, &relay, codec, out).await
        }
    }
}

fn load_identity(data_dir: &Path) -> anyhow::Result<Identity> {
    Ok(Keystore::new(data_dir).load_or_generate()?)
}

/// Open the file-backed store in `data_dir`
pub async fn open_store(data_dir: &Path) -> anyhow::Result<Store> {
    let log = FileOpLog::open(FileOpLogConfig::new(data_dir.join(LOG_FILENAME)))
        .await
        .with_context(|| format!("opening log in {}", data_dir.display()))?;
    Ok(Store::open(log, StoreConfig::default()).await?)
}

fn parse_key(hex_key: &str) -> anyhow::Result<PayloadKey> {
    let bytes = hex::decode(hex_key)
        .map_err(|e| CliError::InvalidArgument(format!("key is not hex: {e}")))?;
    Ok(PayloadKey::from_slice(&bytes)?)
}

async fn write_op(data_dir: &Path, op: Operation, out: &mut impl Write) -> anyhow::Result<()> {
    let store = open_store(data_dir).await?;
    let key = op.key().to_string();
    let id = op.id().clone();
    store.apply_and_wait(op).await?;
    writeln!(out, "{} {}", id, key)?;
    store.shutdown().await?;
    Ok(())
}

fn print_state(store: &Store, out: &mut impl Write) -> anyhow::Result<()> {
    for (key, value) in store.state() {
        writeln!(out, "{}={}", key, String::from_utf8_lossy(&value))?;
    }
    Ok(())
}

async fn run_relay(config: RelayConfig) -> anyhow::Result<()> {
    let server = RelayServer::bind(config).await?;
    let shutdown = server.shutdown_handle();
    info!(addr = %server.local_addr()?, "Relay running, press Ctrl-C to stop");

    let mut task = tokio::spawn(server.run());
    tokio::select! {
        result = &mut task => return Ok(result??),
        _ = tokio::signal::ctrl_c() => {}
    }

    let _ = shutdown.send(());
    task.await??;
    Ok(())
}

async fn run_sync(
    data_dir: &Path,
    relay_url: &str,
    codec: SyncCodec,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let store = open_store(data_dir).await?;
    let connection = WsRelayConnection::connect(relay_url).await?;
    let client = SyncClient::spawn(store.clone(), connection, codec, SyncConfig::default());

    info!(url = relay_url, "Syncing, press Ctrl-C to stop");
    let mut check = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = check.tick() => {
                if client.is_finished() {
                    warn!("Relay connection lost");
                    break;
                }
            }
        }
    }

    let stats = client.shutdown().await;
    store.flush().await?;
    writeln!(
        out,
        "sent {} / received {} / dropped {}",
        stats.sent, stats.received, stats.dropped
    )?;
    print_state(&store, out)?;
    store.shutdown().await?;
    Ok(())
}
