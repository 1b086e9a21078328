//! Logging setup for driftdb binaries
//!
//! # Features
//!
//! - **Console Output**: human-readable or JSONL, written to stderr
//! - **JSONL Files**: structured JSON lines for log aggregation
//! - **File Rotation**: daily/hourly rotation via tracing-appender
//! - **RUST_LOG**: honored when set, otherwise the configured default level
//!
//! # Quick Start
//!
//! ```ignore
//! use driftdb_logging::{DriftSubscriberBuilder, LogConfig};
//!
//! // Keep the guard alive so buffered file output is flushed on exit
//! let _guard = DriftSubscriberBuilder::new()
//!     .with_config(LogConfig::cli())
//!     .init()?;
//! ```

pub mod config;
pub mod error;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use error::{LoggingError, LoggingResult};

use std::fs::{self, File};

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type Base = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

/// Keeps background log writers alive; drop it last
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

/// Builder for configuring and installing the driftdb subscriber
///
/// By default, console output uses JSONL. Use [`LogConfig::cli`] for
/// human-readable output.
#[derive(Debug, Clone, Default)]
pub struct DriftSubscriberBuilder {
    config: LogConfig,
}

impl DriftSubscriberBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Build the subscriber without installing it
    pub fn build(self) -> LoggingResult<(impl Subscriber + Send + Sync + 'static, LoggingGuard)> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.config.default_level)
                .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?,
        };

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guards = Vec::new();

        if self.config.console.enabled {
            layers.push(console_layer(&self.config)?);
        }

        if let Some(file_config) = &self.config.file {
            let (writer, guard) = file_writer(file_config)?;
            guards.push(guard);
            layers.push(json_layer(&self.config.jsonl, writer));
        }

        let subscriber = Registry::default().with(env_filter).with(layers);
        Ok((subscriber, LoggingGuard { _guards: guards }))
    }

    /// Install the subscriber as the global default
    pub fn init(self) -> LoggingResult<LoggingGuard> {
        let (subscriber, guard) = self.build()?;
        subscriber
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
        Ok(guard)
    }
}

fn console_layer(config: &LogConfig) -> LoggingResult<BoxedLayer> {
    let layer = if config.console.pretty {
        tracing_subscriber::fmt::layer()
            .with_ansi(config.console.ansi)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        json_layer(&config.jsonl, std::io::stderr)
    };

    match &config.console.level {
        Some(level) => {
            let level: LevelFilter = level
                .parse()
                .map_err(|_| LoggingError::InvalidFilter(format!("unknown level {level:?}")))?;
            Ok(layer.with_filter(level).boxed())
        }
        None => Ok(layer),
    }
}

fn json_layer<W>(jsonl: &JsonlConfig, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(jsonl.include_spans)
        .with_span_list(jsonl.include_spans)
        .flatten_event(true)
        .with_file(jsonl.include_location)
        .with_line_number(jsonl.include_location)
        .with_writer(writer)
        .boxed()
}

/// Non-blocking writer for the configured file; `Never` truncates on start
fn file_writer(config: &FileConfig) -> LoggingResult<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("log")
        .build(&config.directory)
        .map_err(|e| LoggingError::Io(e.to_string()))?;
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_output_is_jsonl() {
        let temp_dir = TempDir::new().unwrap();
        let (subscriber, guard) = DriftSubscriberBuilder::new()
            .with_console(false)
            .with_file_output(
                FileConfig::new(temp_dir.path())
                    .with_prefix("test")
                    .with_rotation(RotationStrategy::Never),
            )
            .build()
            .unwrap();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(op_id = "abc", "append failed");
        });
        drop(guard);

        let written = fs::read_to_string(temp_dir.path().join("test.log")).unwrap();
        let line = written.lines().next().unwrap();
        assert!(line.starts_with('{'));
        assert!(line.contains("\"op_id\":\"abc\""));
        assert!(line.contains("append failed"));
    }

    #[test]
    fn test_rotating_file_created() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("logs");
        let (_subscriber, _guard) = DriftSubscriberBuilder::new()
            .with_console(false)
            .with_file_output(FileConfig::new(&dir).with_rotation(RotationStrategy::Hourly))
            .build()
            .unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_bad_console_level_rejected() {
        let mut config = LogConfig::default();
        config.console.level = Some("loud".to_string());
        let result = DriftSubscriberBuilder::new().with_config(config).build();
        assert!(matches!(result, Err(LoggingError::InvalidFilter(_))));
    }
}
