//! # driftdb Relay
//!
//! A transport-only broadcast intermediary. Peers connect over WebSocket;
//! every text or binary message one peer sends is forwarded verbatim to all
//! other connected peers. The relay does not parse, store or acknowledge
//! anything.
//!
//! ## Example
//!
//! ```rust,ignore
//! use driftdb_relay::{RelayConfig, RelayServer};
//!
//! let server = RelayServer::bind(RelayConfig::new("127.0.0.1:8080".parse()?)).await?;
//! let shutdown = server.shutdown_handle();
//! tokio::spawn(server.run());
//! // ...
//! let _ = shutdown.send(());
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod relay;
pub mod server;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use frame::Frame;
pub use relay::{DEFAULT_SEND_TIMEOUT, PeerId, Relay, RelayStats};
pub use server::RelayServer;
