//! Logging configuration

use std::path::PathBuf;

/// What the subscriber writes and where
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `"info"` or `"driftdb_store=debug"`
    pub default_level: String,
    pub console: ConsoleConfig,
    /// JSONL file output, off unless set
    pub file: Option<FileConfig>,
    /// Shape of JSON records, for files and non-pretty console output
    pub jsonl: JsonlConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LogConfig {
    /// Human-readable stderr output that stays quiet unless something is wrong
    pub fn cli() -> Self {
        Self {
            default_level: "warn".to_string(),
            console: ConsoleConfig {
                pretty: true,
                ansi: true,
                ..ConsoleConfig::default()
            },
            ..Self::default()
        }
    }
}

/// Console (stderr) output
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Pretty text instead of JSONL
    pub pretty: bool,
    /// Colors, only meaningful with `pretty`
    pub ansi: bool,
    /// Extra level cap for the console only
    pub level: Option<String>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: false,
            ansi: false,
            level: None,
        }
    }
}

/// JSONL log files
#[derive(Debug, Clone)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; files are `<prefix>.log` or `<prefix>.<date>.log`
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl FileConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            prefix: "driftdb".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_rotation(mut self, rotation: RotationStrategy) -> Self {
        self.rotation = rotation;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One file, truncated when logging starts
    Never,
}

/// JSON record options; event fields are always flattened to the top level
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Include the enclosing spans, e.g. the `Store::open` backend field
    pub include_spans: bool,
    /// Include source file and line
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            include_spans: true,
            include_location: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_is_quiet_and_readable() {
        let config = LogConfig::cli();
        assert_eq!(config.default_level, "warn");
        assert!(config.console.enabled);
        assert!(config.console.pretty);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_file_config_defaults() {
        let file = FileConfig::new("/var/log/driftdb").with_prefix("relay");
        assert_eq!(file.directory, PathBuf::from("/var/log/driftdb"));
        assert_eq!(file.prefix, "relay");
        assert_eq!(file.rotation, RotationStrategy::Daily);
    }
}
