//! Device record storage
//!
//! Records are appended as JSON lines to a file in the XDG data directory
//! (~/.local/share/geocollect/records.jsonl). Appends are serialized through
//! a mutex so concurrent requests never interleave lines.

use crate::config::defaults::RECORDS_FILE_NAME;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::record::DeviceRecord;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Destination for finished records
pub trait RecordSink: Send + Sync {
    fn append(&self, record: &DeviceRecord) -> Result<()>;
}

/// JSON-lines record file
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RecordStore {
    /// Get the default record file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Config::data_dir()?.join(RECORDS_FILE_NAME))
    }

    /// Open the store at `path`; the file is created on first append
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record, oldest first
    ///
    /// Lines that fail to parse are skipped with a warning.
    pub fn load(&self) -> Result<Vec<DeviceRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| Error::Storage(format!("Failed to read record file: {}", e)))?;

        let records = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(idx, line)| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(line = idx + 1, "skipping malformed record: {}", e);
                    None
                }
            })
            .collect();

        Ok(records)
    }

    /// Get the most recent records, newest first
    pub fn recent(&self, count: usize) -> Result<Vec<DeviceRecord>> {
        let mut records = self.load()?;
        records.reverse();
        records.truncate(count);
        Ok(records)
    }

    /// Number of stored records
    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl RecordSink for RecordStore {
    fn append(&self, record: &DeviceRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;

        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::Storage("Record store lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create record directory: {}", e))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::Storage(format!("Failed to open record file: {}", e)))?;

        writeln!(file, "{}", line)
            .map_err(|e| Error::Storage(format!("Failed to write record: {}", e)))?;

        debug!(id = %record.id, path = %self.path.display(), "record appended");
        Ok(())
    }
}
