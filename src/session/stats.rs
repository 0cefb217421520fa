//! Session statistics and best-effort host collectors.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Statistics of the last operating session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    /// Session length in seconds.
    #[serde(deserialize_with = "lenient_u64")]
    pub duration: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub epochs: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub train_epochs: u64,
    #[serde(deserialize_with = "lenient_f64")]
    pub avg_reward: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub min_reward: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub max_reward: f64,
    #[serde(deserialize_with = "lenient_u64")]
    pub deauthed: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub associated: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub handshakes: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub peers: u64,
}

impl SessionStats {
    /// Load the session summary at `path`.
    ///
    /// A missing or unreadable summary yields zeroed statistics.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("SESSION_SUMMARY_ABSENT path={}", path.display());
                return Self::default();
            }
            Err(e) => {
                log::warn!(
                    "SESSION_SUMMARY_READ_FAILED path={} error={}",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!(
                "SESSION_SUMMARY_INVALID path={} error={}",
                path.display(),
                e
            );
            Self::default()
        })
    }
}

/// Accepts integers, floats and numeric strings; anything else reads as 0.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()).unwrap_or_else(|| {
        log::warn!("SESSION_FIELD_INVALID value={}", value);
        0.0
    }))
}

/// Counters truncate fractional values; negatives read as 0.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let n = lenient_f64(deserializer)?;
    Ok(if n > 0.0 { n as u64 } else { 0 })
}

/// Output of `uname -a`, or an empty string.
pub fn host_info() -> String {
    match Command::new("uname").arg("-a").output() {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        Ok(out) => {
            log::debug!("HOST_INFO_FAILED status={}", out.status);
            String::new()
        }
        Err(e) => {
            log::debug!("HOST_INFO_FAILED error={}", e);
            String::new()
        }
    }
}

/// Contents of the brain file as JSON, or an empty object.
pub fn load_brain(path: &Path) -> Value {
    fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_else(|| Value::Object(Default::default()))
}
