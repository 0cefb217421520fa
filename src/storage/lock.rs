//! Cross-process pass lock.
//!
//! Passes are triggered externally and may race if two agent processes run
//! on the same unit. An advisory exclusive lock on a well-known file keeps
//! status-file writers serialized; a pass that cannot take it is skipped.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{GridError, GridResult};

/// Held for the duration of a pass; released on drop.
#[derive(Debug)]
pub struct PassLock {
    file: File,
    path: PathBuf,
}

impl PassLock {
    /// Take the lock without blocking.
    pub fn try_acquire(path: &Path) -> GridResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| GridError::io(parent, e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| GridError::io(path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                log::debug!("PASS_LOCK_ACQUIRED path={}", path.display());
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(GridError::Locked(path.to_path_buf()))
            }
            Err(e) => Err(GridError::io(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PassLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!(
                "PASS_LOCK_RELEASE_FAILED path={} error={}",
                self.path.display(),
                e
            );
        }
    }
}
