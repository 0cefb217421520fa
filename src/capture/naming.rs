//! Capture file naming convention.
//!
//! Captures are saved as `<ESSID>_<BSSID>.<ext>` or `<BSSID>.<ext>`, the
//! BSSID being bare hex without separators. The file stem is the network id
//! recorded once a network has been reported.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Even-length run of hex digits
    static ref RAW_BSSID: Regex = Regex::new(r"^(?:[0-9a-fA-F]{2})+$").unwrap();
}

/// One capture reduced to what gets reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// File stem, the key persisted in the report ledger.
    pub network_id: String,
    pub essid: String,
    /// Colon separated, e.g. `aa:bb:cc:dd:ee:ff`.
    pub bssid: String,
}

impl WorkItem {
    /// Derive essid and bssid from the network id alone.
    pub fn from_network_id(network_id: &str) -> Self {
        let (essid, raw_bssid) = split_network_id(network_id);
        Self {
            network_id: network_id.to_string(),
            essid: essid.to_string(),
            bssid: format_bssid(raw_bssid),
        }
    }
}

/// Split a network id into `(essid, raw_bssid)`.
///
/// Splits on the last underscore so ESSIDs containing `_` survive.
pub fn split_network_id(network_id: &str) -> (&str, &str) {
    match network_id.rsplit_once('_') {
        Some((essid, bssid)) => (essid, bssid),
        None => ("", network_id),
    }
}

/// Reformat bare hex into colon separated byte pairs.
///
/// A trailing unpaired character is dropped.
pub fn format_bssid(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    chars
        .chunks_exact(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
}

/// True if `raw` looks like a bare hex BSSID.
pub fn is_raw_bssid(raw: &str) -> bool {
    RAW_BSSID.is_match(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_bssid() {
        assert_eq!(format_bssid("aabbccddeeff"), "aa:bb:cc:dd:ee:ff");
        assert_eq!(format_bssid("AABBCC"), "AA:BB:CC");
        assert_eq!(format_bssid("aabbc"), "aa:bb");
        assert_eq!(format_bssid(""), "");
    }

    #[test]
    fn test_essid_and_bssid() {
        let item = WorkItem::from_network_id("Home_aabbccddeeff");
        assert_eq!(item.network_id, "Home_aabbccddeeff");
        assert_eq!(item.essid, "Home");
        assert_eq!(item.bssid, "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_bare_bssid() {
        let item = WorkItem::from_network_id("112233445566");
        assert_eq!(item.essid, "");
        assert_eq!(item.bssid, "11:22:33:44:55:66");
    }

    #[test]
    fn test_essid_with_underscore() {
        let item = WorkItem::from_network_id("my_home_net_aabbccddeeff");
        assert_eq!(item.essid, "my_home_net");
        assert_eq!(item.bssid, "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_is_raw_bssid() {
        assert!(is_raw_bssid("aabbccddeeff"));
        assert!(is_raw_bssid("AABBCCDDEEFF"));
        assert!(!is_raw_bssid("aabbc"));
        assert!(!is_raw_bssid("zzbbccddeeff"));
        assert!(!is_raw_bssid(""));
    }

    proptest! {
        #[test]
        fn prop_formatted_bssid_roundtrips_to_hex(bytes in proptest::collection::vec(any::<u8>(), 1..8)) {
            let raw = hex::encode(&bytes);
            let formatted = format_bssid(&raw);
            prop_assert_eq!(formatted.split(':').count(), bytes.len());
            prop_assert_eq!(formatted.replace(':', ""), raw);
        }
    }
}
