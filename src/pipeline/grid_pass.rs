//! Grid reporting pass.
//!
//! Runs when the unit comes online:
//! 1. Enumerate captures and count the ones not yet reported
//! 2. Skip everything else if reporting is disabled
//! 3. Obtain a token (cached or freshly enrolled)
//! 4. Dispatch each unreported, non-excluded capture, marking it reported
//!    the moment the grid accepts it
//!
//! Errors end the pass but never escape it; the next pass resumes from
//! whatever was persisted.

use crate::api::{GridEndpoints, Transport};
use crate::capture::{is_excluded, CaptureEnumerator};
use crate::enrollment::{TokenManager, Unit};
use crate::error::GridResult;
use crate::logging::structured::LogContext;
use crate::report::ReportDispatcher;
use crate::storage::Ledger;

use super::context::PassContext;

/// Ledger field holding reported network ids.
pub const REPORTED_FIELD: &str = "reported";

/// Reporting options.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub enabled: bool,
    pub exclude: Vec<String>,
}

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub total: usize,
    pub new: usize,
    pub delivered: usize,
    pub failed: usize,
    pub excluded: usize,
    pub skipped: usize,
    /// Error that ended the pass early, if any.
    pub error: Option<String>,
}

/// Owns the auth and report state and runs grid passes.
pub struct GridReporter {
    tokens: TokenManager,
    reported: Ledger,
    enumerator: CaptureEnumerator,
    endpoints: GridEndpoints,
    options: ReportOptions,
}

impl GridReporter {
    pub fn new(
        tokens: TokenManager,
        reported: Ledger,
        enumerator: CaptureEnumerator,
        endpoints: GridEndpoints,
        options: ReportOptions,
    ) -> Self {
        Self {
            tokens,
            reported,
            enumerator,
            endpoints,
            options,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenManager {
        &mut self.tokens
    }

    pub fn reported(&self) -> &Ledger {
        &self.reported
    }

    /// Re-read auth and report state from disk.
    pub fn reload(&mut self) {
        self.tokens.reload();
        self.reported.reload();
    }

    /// Run one pass. Never fails; problems are logged and summarised.
    pub fn on_internet_available(
        &mut self,
        transport: &dyn Transport,
        unit: Unit<'_>,
        pass: &PassContext,
    ) -> PassSummary {
        let ctx = pass.log_context();
        let mut summary = PassSummary::default();

        if let Err(e) = self.run(transport, unit, &ctx, &mut summary) {
            log::error!("{} GRID_PASS_ABORTED error={}", ctx, e);
            summary.error = Some(e.to_string());
        }

        log::info!(
            "{} GRID_PASS_COMPLETE total={} new={} delivered={} failed={} excluded={} skipped={}",
            ctx,
            summary.total,
            summary.new,
            summary.delivered,
            summary.failed,
            summary.excluded,
            summary.skipped
        );
        summary
    }

    fn run(
        &mut self,
        transport: &dyn Transport,
        unit: Unit<'_>,
        ctx: &LogContext,
        summary: &mut PassSummary,
    ) -> GridResult<()> {
        let captures = self.enumerator.list_captures(ctx);
        let already = captures
            .iter()
            .filter(|c| self.reported.contains(&c.network_id))
            .count();
        summary.total = captures.len();
        summary.new = captures.len() - already;

        if !self.options.enabled {
            log::debug!("{} GRID_REPORTING_DISABLED", ctx);
            return Ok(());
        }

        let mut token = self.tokens.get_token(transport, unit, ctx)?;

        if summary.new == 0 {
            log::debug!("{} GRID_NOTHING_NEW total={}", ctx, summary.total);
            return Ok(());
        }
        log::info!("{} GRID_NEW_NETWORKS count={}", ctx, summary.new);

        let dispatcher = ReportDispatcher::new(transport, self.endpoints.clone());
        for capture in &captures {
            if self.reported.contains(&capture.network_id) {
                continue;
            }

            let item_ctx = ctx.with_item(&capture.network_id);
            if is_excluded(&capture.network_id, &self.options.exclude) {
                log::debug!("{} REPORT_EXCLUDED", item_ctx);
                summary.excluded += 1;
                continue;
            }

            let item = self.enumerator.work_item(capture, ctx);
            if item.bssid.is_empty() {
                log::warn!("{} REPORT_SKIPPED reason=no_bssid", item_ctx);
                summary.skipped += 1;
                continue;
            }

            if dispatcher.dispatch(&mut token, &item, unit, &mut self.tokens, &item_ctx) {
                self.reported.insert(&capture.network_id)?;
                summary.delivered += 1;
            } else {
                summary.failed += 1;
            }
        }

        Ok(())
    }
}
