//! Capture module.
//!
//! Turns the capture directory into reportable work items:
//! - File naming convention and BSSID formatting
//! - Beacon extraction from pcap contents
//! - Directory enumeration
//! - Block-list exclusion

pub mod enumerator;
pub mod exclusion;
pub mod naming;
pub mod pcap;

pub use enumerator::*;
pub use exclusion::*;
pub use naming::*;
pub use pcap::*;
