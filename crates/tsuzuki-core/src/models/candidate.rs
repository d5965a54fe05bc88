use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single item returned by a feed search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique ID (from RSS `<guid>` or the link).
    pub guid: String,
    /// Raw torrent name from the feed.
    pub title: String,
    /// `.torrent` download URL or magnet URI.
    pub link: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub seeders: u32,
    pub size: Option<String>,
    pub info_hash: Option<String>,
}
