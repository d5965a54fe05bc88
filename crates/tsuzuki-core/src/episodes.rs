//! Which episodes still need to be fetched.

use std::collections::BTreeSet;

/// Ascending episodes in `(start, end]` that are not in `excluded`.
///
/// `start >= end` yields an empty list.
pub fn missing_episodes(start: u32, end: u32, excluded: &BTreeSet<u32>) -> Vec<u32> {
    if start >= end {
        return Vec::new();
    }
    (start + 1..=end).filter(|ep| !excluded.contains(ep)).collect()
}

/// Every episode in `(start, end]` is already in `downloaded`.
pub fn is_up_to_date(start: u32, end: u32, downloaded: &BTreeSet<u32>) -> bool {
    missing_episodes(start, end, downloaded).is_empty()
}
