//! Net-pos snapshots.
//!
//! When a handshake is captured, the strongest access points in view are
//! saved next to the capture so the position can be resolved later, once
//! the unit is online.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::GridResult;
use crate::storage::write_atomic;

pub const NETPOS_SUFFIX: &str = ".net-pos.json";
pub const GEO_SUFFIX: &str = ".geo.json";

/// Access points kept per snapshot.
pub const MAX_ACCESS_POINTS: usize = 6;

/// An access point seen at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
    pub mac: String,
    pub rssi: i32,
}

/// Geolocation request document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetPos {
    pub wifi_access_points: Vec<WifiAccessPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiAccessPoint {
    pub mac_address: String,
    pub signal_strength: i32,
}

impl NetPos {
    /// Keep the strongest access points, strongest first.
    pub fn from_access_points(access_points: &[AccessPoint]) -> Self {
        let mut sorted: Vec<&AccessPoint> = access_points.iter().collect();
        sorted.sort_by(|a, b| b.rssi.cmp(&a.rssi));

        Self {
            wifi_access_points: sorted
                .into_iter()
                .take(MAX_ACCESS_POINTS)
                .map(|ap| WifiAccessPoint {
                    mac_address: ap.mac.clone(),
                    signal_strength: ap.rssi,
                })
                .collect(),
        }
    }
}

/// `<dir>/<stem>.net-pos.json` for a capture at `<dir>/<stem>.<ext>`.
pub fn netpos_path(capture: &Path) -> PathBuf {
    sibling_with_suffix(capture, NETPOS_SUFFIX)
}

/// `<dir>/<stem>.geo.json` for a snapshot at `<dir>/<stem>.net-pos.json`.
pub fn geo_path(netpos: &Path) -> PathBuf {
    let name = netpos
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(NETPOS_SUFFIX).unwrap_or(&name);
    netpos.with_file_name(format!("{}{}", stem, GEO_SUFFIX))
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, suffix))
}

/// Save the snapshot for a freshly captured handshake.
pub fn save_netpos(capture: &Path, access_points: &[AccessPoint]) -> GridResult<PathBuf> {
    let path = netpos_path(capture);
    let netpos = NetPos::from_access_points(access_points);
    let body = serde_json::to_vec(&netpos)?;
    write_atomic(&path, &body, SystemTime::now())?;

    log::info!(
        "NETPOS_SAVED path={} access_points={}",
        path.display(),
        netpos.wifi_access_points.len()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn ap(mac: &str, rssi: i32) -> AccessPoint {
        AccessPoint {
            mac: mac.to_string(),
            rssi,
        }
    }

    #[test]
    fn test_keeps_six_strongest() {
        let aps: Vec<AccessPoint> = (0..9)
            .map(|i| ap(&format!("00:00:00:00:00:0{}", i), -90 + i * 5))
            .collect();

        let netpos = NetPos::from_access_points(&aps);
        let strengths: Vec<i32> = netpos
            .wifi_access_points
            .iter()
            .map(|w| w.signal_strength)
            .collect();
        assert_eq!(strengths, vec![-50, -55, -60, -65, -70, -75]);
    }

    #[test]
    fn test_wire_format() {
        let netpos = NetPos::from_access_points(&[ap("aa:bb:cc:dd:ee:ff", -40)]);
        assert_eq!(
            serde_json::to_value(&netpos).unwrap(),
            json!({"wifiAccessPoints": [{"macAddress": "aa:bb:cc:dd:ee:ff", "signalStrength": -40}]})
        );
    }

    #[test]
    fn test_paths() {
        let capture = Path::new("/root/handshakes/Home_aabbccddeeff.pcap");
        let netpos = netpos_path(capture);
        assert_eq!(
            netpos,
            Path::new("/root/handshakes/Home_aabbccddeeff.net-pos.json")
        );
        assert_eq!(
            geo_path(&netpos),
            Path::new("/root/handshakes/Home_aabbccddeeff.geo.json")
        );
    }

    #[test]
    fn test_save_netpos() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("Cafe_010203040506.pcap");

        let path = save_netpos(&capture, &[ap("01:02:03:04:05:06", -60), ap("0a:0b:0c:0d:0e:0f", -30)])
            .unwrap();
        let saved: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved["wifiAccessPoints"][0]["macAddress"], "0a:0b:0c:0d:0e:0f");
        assert_eq!(saved["wifiAccessPoints"].as_array().unwrap().len(), 2);
    }
}
