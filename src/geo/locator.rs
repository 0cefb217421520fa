//! Geolocation pass.
//!
//! Resolves saved net-pos snapshots into positions through a keyed
//! geolocation service. The response is cached verbatim next to the
//! snapshot and the snapshot is recorded in a persisted ledger, so no
//! snapshot is sent twice. Failures leave the snapshot for the next pass.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;

use crate::api::Transport;
use crate::error::{GridError, GridResult};
use crate::geo::netpos::{geo_path, NETPOS_SUFFIX};
use crate::logging::structured::LogContext;
use crate::pipeline::PassContext;
use crate::storage::{write_atomic, Ledger};

/// Ledger field holding processed snapshot paths.
pub const SAVED_FIELD: &str = "saved";

/// Counters for one geolocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoSummary {
    pub pending: usize,
    pub fetched: usize,
    pub cached: usize,
    pub failed: usize,
}

/// Owns the geolocation ledger and runs geolocation passes.
pub struct GeoLocator {
    dir: PathBuf,
    saved: Ledger,
    url: String,
    api_key: String,
}

impl GeoLocator {
    pub fn new(dir: PathBuf, saved: Ledger, url: &str, api_key: &str) -> Self {
        Self {
            dir,
            saved,
            url: url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn saved(&self) -> &Ledger {
        &self.saved
    }

    pub fn reload(&mut self) {
        self.saved.reload();
    }

    /// Resolve every snapshot not yet in the ledger.
    pub fn on_internet_available(&mut self, transport: &dyn Transport, pass: &PassContext) -> GeoSummary {
        let ctx = pass.log_context();
        let pending: Vec<PathBuf> = self
            .list_snapshots(&ctx)
            .into_iter()
            .filter(|p| !self.saved.contains(&p.to_string_lossy()))
            .collect();

        let mut summary = GeoSummary {
            pending: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            log::debug!("{} GEO_NOTHING_NEW", ctx);
            return summary;
        }
        log::info!("{} GEO_NEW_SNAPSHOTS count={}", ctx, pending.len());

        for (idx, snapshot) in pending.iter().enumerate() {
            let key = snapshot.to_string_lossy().into_owned();
            let item_ctx = ctx.with_item(&key);

            let cached = geo_path(snapshot).exists();
            if !cached {
                if let Err(e) = self.resolve(transport, snapshot, &item_ctx) {
                    log::warn!("{} GEO_FETCH_FAILED error={}", item_ctx, e);
                    summary.failed += 1;
                    continue;
                }
            }

            if let Err(e) = self.saved.insert(&key) {
                log::error!("{} GEO_LEDGER_WRITE_FAILED error={}", item_ctx, e);
                summary.failed += 1;
                break;
            }

            if cached {
                summary.cached += 1;
            } else {
                summary.fetched += 1;
                log::info!("{} GEO_PROGRESS done={} of={}", item_ctx, idx + 1, pending.len());
            }
        }

        log::info!(
            "{} GEO_PASS_COMPLETE fetched={} cached={} failed={}",
            ctx,
            summary.fetched,
            summary.cached,
            summary.failed
        );
        summary
    }

    fn list_snapshots(&self, ctx: &LogContext) -> Vec<PathBuf> {
        match fs::read_dir(&self.dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .map_or(false, |n| n.to_string_lossy().ends_with(NETPOS_SUFFIX))
                })
                .collect(),
            Err(e) => {
                log::warn!(
                    "{} CAPTURE_DIR_UNREADABLE dir={} error={}",
                    ctx,
                    self.dir.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn resolve(&self, transport: &dyn Transport, snapshot: &Path, ctx: &LogContext) -> GridResult<()> {
        let raw = fs::read_to_string(snapshot).map_err(|e| GridError::io(snapshot, e))?;
        let request: Value = serde_json::from_str(&raw)?;

        let url = format!("{}?key={}", self.url, self.api_key);
        let response = transport.post_json(&url, &request, None)?;
        if !response.is_success() {
            return Err(GridError::Api {
                status: response.status,
                body: response.body,
            });
        }
        let position = response.json()?;

        let target = geo_path(snapshot);
        write_atomic(&target, &serde_json::to_vec(&position)?, SystemTime::now())?;
        log::info!("{} GEO_SAVED path={}", ctx, target.display());
        Ok(())
    }
}
