//! Exclusion filter.
//!
//! Networks on the configured block-list are never reported. Entries may be
//! written as ESSIDs or as BSSIDs with or without colons.

/// Check whether a network id matches any block-list entry.
///
/// Returns true if a lower-cased entry, as typed or with colons removed,
/// is a substring of the lower-cased network id. Empty entries never match.
///
/// # Examples
/// ```
/// use grid_sync::capture::is_excluded;
/// let block = vec!["DE:AD:BE:EF".to_string()];
/// assert!(is_excluded("Home_deadbeef0011", &block));
/// assert!(!is_excluded("Home_aa11bb22", &block));
/// ```
pub fn is_excluded(network_id: &str, block_list: &[String]) -> bool {
    let net = network_id.to_lowercase();
    block_list
        .iter()
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            let entry = entry.to_lowercase();
            let bare = entry.replace(':', "");
            net.contains(&entry) || (!bare.is_empty() && net.contains(&bare))
        })
}
