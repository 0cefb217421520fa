//! Durable JSON status documents.
//!
//! A status file holds one JSON document. Its modification time is the
//! "last write" stamp used for freshness checks, so it is set from the
//! injected clock on every write. Writes go to a sibling temp file that is
//! renamed over the target; readers see the old or the new document, never
//! a partial one.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::clock::Clock;
use crate::error::{GridError, GridResult};

/// A JSON document persisted at a fixed path.
pub struct StatusFile {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    data: Option<Value>,
    written_at: Option<DateTime<Utc>>,
}

impl StatusFile {
    /// Open the status file at `path`, loading whatever is there.
    ///
    /// Missing or unparsable files load as absent.
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let mut file = Self {
            path: path.into(),
            clock,
            data: None,
            written_at: None,
        };
        file.reload();
        file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the document and its timestamp from disk.
    pub fn reload(&mut self) {
        self.data = None;
        self.written_at = None;

        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("STATUS_FILE_ABSENT path={}", self.path.display());
                return;
            }
            Err(e) => {
                log::warn!(
                    "STATUS_FILE_READ_FAILED path={} error={}",
                    self.path.display(),
                    e
                );
                return;
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => self.data = Some(value),
            Err(e) => {
                log::warn!(
                    "STATUS_FILE_CORRUPT path={} error={}",
                    self.path.display(),
                    e
                );
                return;
            }
        }

        self.written_at = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .ok();
    }

    /// Current document, if one has been written.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// When the current document was written.
    pub fn written_at(&self) -> Option<DateTime<Utc>> {
        self.written_at
    }

    /// Replace the stored document and stamp the current time.
    pub fn write(&mut self, document: Value) -> GridResult<()> {
        let now = self.clock.now();

        let body = serde_json::to_vec(&document)?;
        write_atomic(&self.path, &body, SystemTime::from(now))?;

        log::debug!(
            "STATUS_FILE_WRITTEN path={} bytes={}",
            self.path.display(),
            body.len()
        );

        self.data = Some(document);
        self.written_at = Some(now);
        Ok(())
    }

    /// Minutes since the last write, or `None` if never written.
    pub fn age_minutes(&self) -> Option<f64> {
        self.written_at.map(|at| {
            let elapsed = self.clock.now() - at;
            elapsed.num_milliseconds() as f64 / 60_000.0
        })
    }

    /// True if the document was written less than `minutes` ago.
    pub fn newer_than_minutes(&self, minutes: f64) -> bool {
        matches!(self.age_minutes(), Some(age) if age < minutes)
    }

    /// Read a top-level field, falling back to `default`.
    pub fn field_or(&self, name: &str, default: Value) -> Value {
        self.data
            .as_ref()
            .and_then(|d| d.get(name))
            .cloned()
            .unwrap_or(default)
    }
}

/// Write `bytes` to `path` via a temp file and rename, stamping `modified`.
pub fn write_atomic(path: &Path, bytes: &[u8], modified: SystemTime) -> GridResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| GridError::io(parent, e))?;
        }
    }

    let tmp_path = temp_path(path);
    {
        let mut tmp = File::create(&tmp_path).map_err(|e| GridError::io(&tmp_path, e))?;
        tmp.write_all(bytes)
            .map_err(|e| GridError::io(&tmp_path, e))?;
        tmp.set_modified(modified)
            .map_err(|e| GridError::io(&tmp_path, e))?;
        tmp.sync_all().map_err(|e| GridError::io(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| GridError::io(path, e))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
