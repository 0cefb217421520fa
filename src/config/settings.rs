//! Agent settings.
//!
//! Every field has a default so a minimal (or empty) TOML file is a valid
//! configuration. Loading only parses; `validate` applies the rules.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

pub const DEFAULT_API_URL: &str = "https://api.pwnagotchi.ai";
pub const DEFAULT_GEO_URL: &str = "https://location.services.mozilla.com/v1/geolocate";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub api_url: String,
    pub capture_dir: PathBuf,
    pub capture_extension: String,
    pub auth_path: PathBuf,
    pub report_path: PathBuf,
    pub session_path: PathBuf,
    pub brain_path: PathBuf,
    pub key_path: PathBuf,
    pub lock_path: PathBuf,
    /// Falls back to the hostname when unset.
    pub device_name: Option<String>,
    pub timeout_secs: u64,
    pub report: ReportSettings,
    pub geo: GeoSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub enabled: bool,
    /// ESSIDs or BSSIDs never reported.
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSettings {
    /// Geolocation runs only when a key is configured.
    pub api_key: Option<String>,
    pub url: String,
    pub saved_path: PathBuf,
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            capture_dir: PathBuf::from("/root/handshakes"),
            capture_extension: "pcap".to_string(),
            auth_path: PathBuf::from("/root/.api-enrollment.json"),
            report_path: PathBuf::from("/root/.api-report.json"),
            session_path: PathBuf::from("/root/.grid-last-session.json"),
            brain_path: PathBuf::from("/root/brain.json"),
            key_path: PathBuf::from("/etc/grid-sync/id_ed25519.pem"),
            lock_path: PathBuf::from("/tmp/grid-sync.lock"),
            device_name: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            report: ReportSettings::default(),
            geo: GeoSettings::default(),
        }
    }
}

impl Default for GeoSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            url: DEFAULT_GEO_URL.to_string(),
            saved_path: PathBuf::from("/root/.net_pos_saved.json"),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AgentConfig {
    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config as TOML")?;
        Ok(config)
    }

    pub fn validate(&self) -> GridResult<()> {
        if self.api_url.trim().is_empty() {
            return Err(GridError::Config("api_url must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(GridError::Config("timeout_secs must be positive".to_string()));
        }
        if self.geo.timeout_secs == 0 {
            return Err(GridError::Config(
                "geo.timeout_secs must be positive".to_string(),
            ));
        }
        if self.capture_extension.trim().is_empty() {
            return Err(GridError::Config(
                "capture_extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn geo_timeout(&self) -> Duration {
        Duration::from_secs(self.geo.timeout_secs)
    }

    /// Configured API key, ignoring blank values.
    pub fn geo_api_key(&self) -> Option<&str> {
        self.geo
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
