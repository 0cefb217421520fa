//! Agent wiring.
//!
//! Builds the managers from an `AgentConfig` and runs passes on demand.
//! Each pass holds the cross-process pass lock for its whole duration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::{GridEndpoints, HttpTransport, Transport};
use crate::capture::{CaptureEnumerator, PcapInspector};
use crate::clock::{Clock, SystemClock};
use crate::config::AgentConfig;
use crate::enrollment::{TokenManager, Unit};
use crate::error::{GridError, GridResult};
use crate::geo::{save_netpos, AccessPoint, GeoLocator, GeoSummary, SAVED_FIELD};
use crate::identity::{host_device_name, Ed25519Identity, IdentityProvider};
use crate::pipeline::{GridReporter, PassContext, PassSummary, ReportOptions, REPORTED_FIELD};
use crate::session::SessionStats;
use crate::storage::{Ledger, PassLock, StatusFile};

/// Outcome of a full pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass_id: String,
    pub grid: PassSummary,
    /// `None` when geolocation is not configured.
    pub geo: Option<GeoSummary>,
}

/// Snapshot of persisted agent state.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStatus {
    pub identity: String,
    pub token_age_minutes: Option<f64>,
    pub token_fresh: bool,
    pub reported: usize,
    pub geo_saved: Option<usize>,
}

struct AgentState {
    reporter: GridReporter,
    geo: Option<GeoLocator>,
}

impl AgentState {
    fn reload(&mut self) {
        self.reporter.reload();
        if let Some(geo) = self.geo.as_mut() {
            geo.reload();
        }
    }
}

pub struct Agent {
    config: AgentConfig,
    identity: Box<dyn IdentityProvider>,
    grid_transport: Arc<dyn Transport>,
    geo_transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    state: Mutex<AgentState>,
}

impl Agent {
    /// Build an agent talking to the real services.
    pub fn from_config(config: AgentConfig) -> GridResult<Self> {
        config.validate()?;

        let device_name = config
            .device_name
            .clone()
            .unwrap_or_else(host_device_name);
        let identity = Ed25519Identity::load_or_generate(&device_name, &config.key_path)?;
        let grid_transport = Arc::new(HttpTransport::new(config.timeout())?);
        let geo_transport = Arc::new(HttpTransport::new(config.geo_timeout())?);

        Self::with_parts(
            config,
            Box::new(identity),
            grid_transport,
            geo_transport,
            Arc::new(SystemClock),
        )
    }

    /// Build an agent from explicit collaborators.
    pub fn with_parts(
        config: AgentConfig,
        identity: Box<dyn IdentityProvider>,
        grid_transport: Arc<dyn Transport>,
        geo_transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> GridResult<Self> {
        config.validate()?;

        let endpoints = GridEndpoints::new(&config.api_url);
        let tokens = TokenManager::new(
            StatusFile::open(&config.auth_path, clock.clone()),
            endpoints.clone(),
            config.brain_path.clone(),
        );
        let reported = Ledger::open(&config.report_path, REPORTED_FIELD, clock.clone());
        let enumerator = CaptureEnumerator::new(
            config.capture_dir.clone(),
            &config.capture_extension,
            Box::new(PcapInspector),
        );
        let options = ReportOptions {
            enabled: config.report.enabled,
            exclude: config.report.exclude.clone(),
        };
        let reporter = GridReporter::new(tokens, reported, enumerator, endpoints, options);

        let geo = match config.geo_api_key() {
            Some(key) => Some(GeoLocator::new(
                config.capture_dir.clone(),
                Ledger::open(&config.geo.saved_path, SAVED_FIELD, clock.clone()),
                &config.geo.url,
                key,
            )),
            None => {
                log::error!("GEO_DISABLED reason=no_api_key");
                None
            }
        };

        log::info!(
            "AGENT_READY identity={} api_url={} capture_dir={} reporting={} geo={}",
            identity.identity(),
            config.api_url,
            config.capture_dir.display(),
            config.report.enabled,
            geo.is_some()
        );

        Ok(Self {
            config,
            identity,
            grid_transport,
            geo_transport,
            clock,
            state: Mutex::new(AgentState { reporter, geo }),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run the grid pass then the geolocation pass.
    ///
    /// Returns `Ok(None)` when another process holds the pass lock.
    pub fn run_pass(&self) -> GridResult<Option<PassReport>> {
        let Some(_lock) = self.try_lock()? else {
            return Ok(None);
        };

        let session = SessionStats::load(&self.config.session_path);
        let pass = PassContext::new(self.clock.now());
        log::info!("{} PASS_START", pass.log_context());

        let mut state = self.state.lock();
        // Another process may have written while we were idle.
        state.reload();
        let grid = state
            .reporter
            .on_internet_available(self.grid_transport.as_ref(), self.unit(&session), &pass);
        let geo = state
            .geo
            .as_mut()
            .map(|geo| geo.on_internet_available(self.geo_transport.as_ref(), &pass));

        Ok(Some(PassReport {
            pass_id: pass.pass_id,
            grid,
            geo,
        }))
    }

    /// Enroll now regardless of token freshness.
    pub fn enroll(&self) -> GridResult<String> {
        let Some(_lock) = self.try_lock()? else {
            return Err(GridError::Locked(self.config.lock_path.clone()));
        };

        let session = SessionStats::load(&self.config.session_path);
        let pass = PassContext::new(self.clock.now());
        let mut state = self.state.lock();
        state.reload();
        state.reporter.tokens_mut().refresh_token(
            self.grid_transport.as_ref(),
            self.unit(&session),
            &pass.log_context(),
        )
    }

    pub fn status(&self) -> AgentStatus {
        let mut state = self.state.lock();
        state.reload();
        let tokens = state.reporter.tokens();
        AgentStatus {
            identity: self.identity.identity(),
            token_age_minutes: tokens.token_age_minutes(),
            token_fresh: tokens.cached_token().is_some(),
            reported: state.reporter.reported().len(),
            geo_saved: state.geo.as_ref().map(|g| g.saved().len()),
        }
    }

    /// Save a net-pos snapshot for a new capture.
    ///
    /// Snapshots are kept even without an API key so they can be resolved
    /// once one is configured.
    pub fn on_handshake(&self, capture: &Path, access_points: &[AccessPoint]) -> GridResult<PathBuf> {
        save_netpos(capture, access_points)
    }

    fn unit<'a>(&'a self, session: &'a SessionStats) -> Unit<'a> {
        Unit {
            identity: self.identity.as_ref(),
            session,
        }
    }

    fn try_lock(&self) -> GridResult<Option<PassLock>> {
        match PassLock::try_acquire(&self.config.lock_path) {
            Ok(lock) => Ok(Some(lock)),
            Err(GridError::Locked(path)) => {
                log::warn!("PASS_SKIPPED reason=locked path={}", path.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
