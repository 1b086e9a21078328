//! JSON Lines operation log
//!
//! Each operation is written as one JSON object followed by `\n`, using the
//! same encoding as the sync wire format:
//!
//! ```text
//! {"id":"..","actor":"A","ts":100,"type":"set","key":"x","value":"djE="}
//! {"id":"..","actor":"B","ts":200,"type":"delete","key":"x","value":""}
//! ```
//!
//! Every line parses independently. A crash mid-write leaves at most one
//! partial line at the end of the file; [`FileOpLog::load`] skips it, and
//! [`FileOpLog::open`] terminates it so the next append starts cleanly.
//! An append that fails or is cancelled part-way marks the tail dirty, and
//! the next append terminates any fragment before writing its own record.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, instrument, warn};

use driftdb_core::Operation;

use crate::OpLog;
use crate::error::StorageError;

/// Configuration for a file-backed operation log
#[derive(Debug, Clone)]
pub struct FileOpLogConfig {
    /// Path of the log file
    pub path: PathBuf,
    /// Whether to fsync after every append
    pub sync_on_write: bool,
}

impl FileOpLogConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync_on_write: true,
        }
    }

    /// Set whether each append is fsynced before returning
    pub fn with_sync_on_write(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }
}

impl Default for FileOpLogConfig {
    fn default() -> Self {
        Self::new("./driftdb-data/ops.jsonl")
    }
}

/// Append-only operation log stored as a JSON Lines file
#[derive(Debug)]
pub struct FileOpLog {
    config: FileOpLogConfig,
    /// Write handle, opened in append mode
    file: File,
    /// Operations appended through this handle
    appended: u64,
    /// Set while a record is being written; still set on the next append
    /// means the previous one did not finish
    dirty_tail: bool,
}

impl FileOpLog {
    /// Open (or create) the log file
    #[instrument(skip_all, fields(path = %config.path.display()))]
    pub async fn open(config: FileOpLogConfig) -> Result<Self, StorageError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .await?;

        if Self::has_partial_tail(&config.path).await? {
            warn!("Log ends with a partial record, terminating it");
            file.write_all(b"\n").await?;
            file.flush().await?;
        }

        info!("Opened operation log");

        Ok(Self {
            config,
            file,
            appended: 0,
            dirty_tail: false,
        })
    }

    /// Whether the file is non-empty and its last byte is not a newline
    async fn has_partial_tail(path: &Path) -> Result<bool, StorageError> {
        let mut reader = File::open(path).await?;
        let len = reader.metadata().await?.len();
        if len == 0 {
            return Ok(false);
        }

        reader.seek(SeekFrom::End(-1)).await?;
        let mut last = [0u8; 1];
        reader.read_exact(&mut last).await?;
        Ok(last[0] != b'\n')
    }

    /// Terminate whatever an interrupted append left behind
    async fn repair_tail(&mut self) -> Result<(), StorageError> {
        // Wait for any write the cancelled append left in flight
        self.file.flush().await?;
        if Self::has_partial_tail(&self.config.path).await? {
            warn!("Previous append was interrupted, terminating partial record");
            self.file.write_all(b"\n").await?;
            self.file.flush().await?;
        }
        self.dirty_tail = false;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Operations appended through this handle since it was opened
    pub fn appended(&self) -> u64 {
        self.appended
    }
}

#[async_trait]
impl OpLog for FileOpLog {
    async fn append(&mut self, op: &Operation) -> Result<(), StorageError> {
        let mut line =
            serde_json::to_vec(op).map_err(|e| StorageError::serialization(e.to_string()))?;
        line.push(b'\n');

        if self.dirty_tail {
            self.repair_tail().await?;
        }

        self.dirty_tail = true;
        self.file.write_all(&line).await?;
        self.file.flush().await?;
        self.dirty_tail = false;

        if self.config.sync_on_write {
            self.file.sync_data().await?;
        }

        self.appended += 1;
        debug!(op_id = %op.id(), key = op.key(), "Appended operation");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.config.path.display()))]
    async fn load(&self) -> Result<Vec<Operation>, StorageError> {
        let file = match File::open(&self.config.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);
        let mut ops = Vec::new();
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf).await?;
            if read == 0 {
                break;
            }
            line_no += 1;

            let complete = buf.last() == Some(&b'\n');
            let record = buf.trim_ascii();
            if record.is_empty() {
                continue;
            }

            match serde_json::from_slice::<Operation>(record) {
                Ok(op) => ops.push(op),
                Err(e) if !complete => {
                    warn!(line = line_no, error = %e, "Skipping partial trailing record");
                }
                Err(e) => {
                    warn!(line = line_no, error = %e, "Skipping malformed record");
                }
            }
        }

        info!(entries = ops.len(), "Loaded operation log");
        Ok(ops)
    }

    async fn flush(&mut self) -> Result<(), StorageError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}
