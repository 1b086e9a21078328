//! driftdb command-line interface
//!
//! Wires a file-backed store in a data directory to the sync client and
//! provides the relay server entry point.

pub mod commands;
pub mod config;
pub mod error;
pub mod keystore;

pub use config::{Cli, Command};
pub use error::{CliError, CliResult};
pub use keystore::Keystore;
