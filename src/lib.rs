//! Grid Sync - background sync agent for field capture units
//!
//! Each time the unit comes online the agent:
//!
//! 1. **Enrolls** - signs its identity and exchanges it for a short-lived token
//!    (reused for 25 minutes)
//! 2. **Reports** - sends every captured access point the grid has not seen yet,
//!    exactly once, surviving restarts and crashes
//! 3. **Geolocates** - resolves net-pos snapshots saved at capture time
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `agent` - Wires configuration, identity and both passes
//! - `pipeline` - Grid pass orchestrator
//! - `enrollment` - Token lifecycle and signed enrollment
//! - `report` - Report dispatch with single refresh-and-retry
//! - `capture` - Capture enumeration, naming and exclusion
//! - `geo` - Net-pos snapshots and the geolocation pass
//! - `storage` - Durable status files, ledgers and the pass lock
//! - `api` - Endpoints, wire models and HTTP transport
//! - `identity` - Ed25519 unit identity
//! - `session` - Session summary and host info
//! - `config` - TOML configuration
//! - `logging` - Structured logging with pass context

pub mod agent;
pub mod api;
pub mod capture;
pub mod clock;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod geo;
pub mod identity;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod storage;

pub use agent::{Agent, AgentStatus, PassReport};
pub use config::AgentConfig;
pub use error::{GridError, GridResult};

/// Initialize the process-wide logger.
///
/// Defaults to `Info`; `RUST_LOG` overrides.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log::LevelFilter::Info.as_str()),
    )
    .format_timestamp_millis()
    .try_init();
}
