//! Command-line configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "driftdb", about = "Peer-replicated key-value store", version)]
pub struct Cli {
    /// Directory holding the operation log and device identity
    #[arg(long, global = true, default_value = "./driftdb-data")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also write JSONL logs to this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Level used when `--log-level` is not given
    pub fn effective_log_level(&self) -> &str {
        match (&self.log_level, &self.command) {
            (Some(level), _) => level,
            (None, Command::Relay { .. } | Command::Sync { .. }) => "info",
            (None, _) => "warn",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a relay that rebroadcasts every message to all other peers
    Relay {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
        /// Frames buffered per peer before frames are dropped
        #[arg(long, default_value_t = 256)]
        peer_buffer: usize,
    },
    /// Set a key
    Set { key: String, value: String },
    /// Delete a key
    Delete { key: String },
    /// Print the value of a key
    Get {
        key: String,
        /// Print the value as hex instead of text
        #[arg(long)]
        hex: bool,
    },
    /// Print every live key and value
    State,
    /// Print the operation history as JSON lines
    Ops,
    /// Take a snapshot of the current state
    Snapshot {
        /// Cutoff timestamp in nanoseconds; defaults to now
        #[arg(long)]
        cutoff: Option<i64>,
    },
    /// Print this device's actor id
    Identity,
    /// Replicate with peers through a relay until interrupted
    Sync {
        /// Relay URL, e.g. ws://127.0.0.1:8080/
        #[arg(long)]
        relay: String,
        /// Encrypt payloads with AES-256-GCM
        #[arg(long)]
        encrypt: bool,
        /// Shared 32-byte key as hex; defaults to this device's key
        #[arg(long, requires = "encrypt")]
        key: Option<String>,
    },
}
