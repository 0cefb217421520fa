//! Persisted ordered set of processed keys.
//!
//! Backs both the reported-networks list and the geolocation "already
//! saved" list. Every insert is flushed before it returns, so a crash can
//! lose at most the insert in flight.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::clock::Clock;
use crate::error::GridResult;
use crate::storage::status_file::StatusFile;

/// Append-only set of string keys stored under one field of a status file.
pub struct Ledger {
    file: StatusFile,
    field: String,
    entries: Vec<String>,
    index: HashSet<String>,
}

impl Ledger {
    /// Load the ledger stored under `field` at `path`.
    ///
    /// Non-string and duplicate entries in the stored array are dropped.
    pub fn open(path: impl Into<PathBuf>, field: &str, clock: Arc<dyn Clock>) -> Self {
        let mut ledger = Self {
            file: StatusFile::open(path, clock),
            field: field.to_string(),
            entries: Vec::new(),
            index: HashSet::new(),
        };
        ledger.load_entries();
        ledger
    }

    /// Re-read the ledger from disk, picking up writes by other processes.
    pub fn reload(&mut self) {
        self.file.reload();
        self.load_entries();
    }

    fn load_entries(&mut self) {
        self.entries.clear();
        self.index.clear();

        match self.file.field_or(&self.field, Value::Array(Vec::new())) {
            Value::Array(items) => {
                for item in items {
                    if let Value::String(key) = item {
                        if self.index.insert(key.clone()) {
                            self.entries.push(key);
                        }
                    }
                }
            }
            _ => log::warn!(
                "LEDGER_FIELD_INVALID path={} field={}",
                self.file.path().display(),
                self.field
            ),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Add `key` and persist. Returns `false` if it was already present.
    ///
    /// On a failed write the in-memory set is left unchanged.
    pub fn insert(&mut self, key: &str) -> GridResult<bool> {
        if self.index.contains(key) {
            return Ok(false);
        }

        self.entries.push(key.to_string());
        let document = json!({ self.field.as_str(): &self.entries });
        if let Err(e) = self.file.write(document) {
            self.entries.pop();
            return Err(e);
        }

        self.index.insert(key.to_string());
        Ok(true)
    }
}
