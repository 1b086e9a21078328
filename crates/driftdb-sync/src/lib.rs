//! # driftdb Sync
//!
//! Moves operations between a local [`Store`](driftdb_store::Store) and a
//! relay.
//!
//! ## Features
//!
//! - Deterministic JSON wire encoding ([`encode`] / [`decode`])
//! - Optional AES-256-GCM payload sealing ([`SyncCodec`])
//! - WebSocket and in-process connections ([`RelayConnection`])
//! - A background client that publishes local writes and applies remote
//!   ones ([`SyncClient`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use driftdb_sync::{SyncClient, SyncCodec, SyncConfig, WsRelayConnection};
//!
//! let connection = WsRelayConnection::connect("ws://127.0.0.1:8080/").await?;
//! let client = SyncClient::spawn(store.clone(), connection, SyncCodec::plaintext(), SyncConfig::default());
//! // ...
//! client.shutdown().await;
//! ```

pub mod client;
pub mod codec;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod websocket;

pub use client::{SyncClient, SyncConfig, SyncStats};
pub use codec::SyncCodec;
pub use connection::{ChannelConnection, RelayConnection};
pub use error::{SyncError, SyncResult};
pub use protocol::{decode, encode};
pub use websocket::WsRelayConnection;
