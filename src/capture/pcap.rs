//! Access point identity from capture contents.
//!
//! Reads a classic pcap file and returns the ESSID and BSSID of the first
//! beacon or probe response it contains. Supports raw 802.11 and radiotap
//! link types.

use std::fs;
use std::path::Path;

use crate::error::{GridError, GridResult};

const LINKTYPE_IEEE802_11: u32 = 105;
const LINKTYPE_IEEE802_11_RADIOTAP: u32 = 127;

const PCAP_HEADER_LEN: usize = 24;
const RECORD_HEADER_LEN: usize = 16;
/// Management header (24) + timestamp, interval, capabilities (12).
const BEACON_FIXED_LEN: usize = 36;

const SUBTYPE_PROBE_RESPONSE: u8 = 5;
const SUBTYPE_BEACON: u8 = 8;
const IE_SSID: u8 = 0;

/// ESSID/BSSID pair extracted from a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApIdentity {
    pub essid: String,
    pub bssid: String,
}

/// Extracts the access point identity from a capture file.
pub trait CaptureInspector {
    fn inspect(&self, path: &Path) -> GridResult<ApIdentity>;
}

/// Beacon parser for pcap captures.
#[derive(Debug, Default, Clone, Copy)]
pub struct PcapInspector;

impl CaptureInspector for PcapInspector {
    fn inspect(&self, path: &Path) -> GridResult<ApIdentity> {
        let bytes = fs::read(path).map_err(|e| GridError::io(path, e))?;
        parse_pcap(&bytes).map_err(|message| GridError::capture(path, message))
    }
}

#[derive(Clone, Copy)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u32_at(self, bytes: &[u8], offset: usize) -> Option<u32> {
        let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u32::from_le_bytes(raw),
            Endian::Big => u32::from_be_bytes(raw),
        })
    }
}

/// Find the first beacon with a visible SSID; hidden-SSID beacons are used
/// only if nothing better turns up.
pub fn parse_pcap(bytes: &[u8]) -> Result<ApIdentity, String> {
    if bytes.len() < PCAP_HEADER_LEN {
        return Err("truncated pcap header".to_string());
    }

    let endian = match &bytes[0..4] {
        [0xd4, 0xc3, 0xb2, 0xa1] | [0x4d, 0x3c, 0xb2, 0xa1] => Endian::Little,
        [0xa1, 0xb2, 0xc3, 0xd4] | [0xa1, 0xb2, 0x3c, 0x4d] => Endian::Big,
        _ => return Err("not a pcap file".to_string()),
    };
    let linktype = endian
        .u32_at(bytes, 20)
        .ok_or_else(|| "truncated pcap header".to_string())?;
    if linktype != LINKTYPE_IEEE802_11 && linktype != LINKTYPE_IEEE802_11_RADIOTAP {
        return Err(format!("unsupported link type {}", linktype));
    }

    let mut hidden: Option<ApIdentity> = None;
    let mut offset = PCAP_HEADER_LEN;
    while offset + RECORD_HEADER_LEN <= bytes.len() {
        let incl_len = endian.u32_at(bytes, offset + 8).unwrap_or(0) as usize;
        let start = offset + RECORD_HEADER_LEN;
        let Some(end) = start.checked_add(incl_len) else {
            break;
        };
        let Some(packet) = bytes.get(start..end) else {
            break;
        };
        offset = end;

        let frame = if linktype == LINKTYPE_IEEE802_11_RADIOTAP {
            match strip_radiotap(packet) {
                Some(frame) => frame,
                None => continue,
            }
        } else {
            packet
        };

        if let Some(ap) = parse_beacon(frame) {
            if !ap.essid.is_empty() {
                return Ok(ap);
            }
            hidden.get_or_insert(ap);
        }
    }

    hidden.ok_or_else(|| "no beacon or probe response found".to_string())
}

fn strip_radiotap(packet: &[u8]) -> Option<&[u8]> {
    let len = u16::from_le_bytes(packet.get(2..4)?.try_into().ok()?) as usize;
    packet.get(len..)
}

fn parse_beacon(frame: &[u8]) -> Option<ApIdentity> {
    if frame.len() < BEACON_FIXED_LEN {
        return None;
    }

    let fc = frame[0];
    let frame_type = (fc >> 2) & 0x3;
    let subtype = (fc >> 4) & 0xf;
    if frame_type != 0 || (subtype != SUBTYPE_BEACON && subtype != SUBTYPE_PROBE_RESPONSE) {
        return None;
    }

    let bssid = frame[16..22]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":");

    let mut essid = String::new();
    let mut ie = BEACON_FIXED_LEN;
    while ie + 2 <= frame.len() {
        let id = frame[ie];
        let len = frame[ie + 1] as usize;
        let Some(value) = frame.get(ie + 2..ie + 2 + len) else {
            break;
        };
        if id == IE_SSID {
            if value.iter().any(|b| *b != 0) {
                essid = String::from_utf8_lossy(value).into_owned();
            }
            break;
        }
        ie += 2 + len;
    }

    Some(ApIdentity { essid, bssid })
}
