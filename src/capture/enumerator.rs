//! Work item enumeration.
//!
//! Listing is cheap (directory entries only); resolving a capture into a
//! work item may parse the file, so the pipeline does it lazily for the
//! captures it actually reports.

use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::naming::{is_raw_bssid, split_network_id, WorkItem};
use crate::capture::pcap::CaptureInspector;
use crate::logging::structured::LogContext;

/// A capture file on disk and its network id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFile {
    pub network_id: String,
    pub path: PathBuf,
}

/// Lists captures in a directory and resolves them into work items.
pub struct CaptureEnumerator {
    dir: PathBuf,
    extension: String,
    inspector: Box<dyn CaptureInspector>,
}

impl CaptureEnumerator {
    pub fn new(dir: PathBuf, extension: &str, inspector: Box<dyn CaptureInspector>) -> Self {
        Self {
            dir,
            extension: extension.trim_start_matches('.').to_string(),
            inspector,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every file with the capture extension, in directory order.
    ///
    /// An unreadable directory yields an empty list.
    pub fn list_captures(&self, ctx: &LogContext) -> Vec<CaptureFile> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!(
                    "{} CAPTURE_DIR_UNREADABLE dir={} error={}",
                    ctx,
                    self.dir.display(),
                    e
                );
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .map_or(false, |ext| ext.to_string_lossy() == self.extension)
            })
            .filter_map(|path| {
                let network_id = path.file_stem()?.to_string_lossy().into_owned();
                Some(CaptureFile { network_id, path })
            })
            .collect()
    }

    /// Resolve essid and bssid for one capture.
    ///
    /// Capture contents win; the file name is the fallback.
    pub fn work_item(&self, capture: &CaptureFile, ctx: &LogContext) -> WorkItem {
        let item_ctx = ctx.with_item(&capture.network_id);
        let fallback = WorkItem::from_network_id(&capture.network_id);

        let (_, raw_bssid) = split_network_id(&capture.network_id);
        if !is_raw_bssid(raw_bssid) {
            log::debug!("{} CAPTURE_NAME_UNUSUAL raw_bssid={}", item_ctx, raw_bssid);
        }

        match self.inspector.inspect(&capture.path) {
            Ok(ap) => {
                log::debug!(
                    "{} CAPTURE_PARSED essid={} bssid={}",
                    item_ctx,
                    ap.essid,
                    ap.bssid
                );
                WorkItem {
                    network_id: capture.network_id.clone(),
                    essid: ap.essid,
                    bssid: ap.bssid,
                }
            }
            Err(e) => {
                log::warn!("{} CAPTURE_PARSE_FALLBACK error={}", item_ctx, e);
                fallback
            }
        }
    }

    /// All work items, resolved.
    pub fn list_items(&self, ctx: &LogContext) -> Vec<WorkItem> {
        self.list_captures(ctx)
            .iter()
            .map(|capture| self.work_item(capture, ctx))
            .collect()
    }
}
