use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Release-type markers found in a release name.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct ReleaseFlags: u8 {
        const BATCH = 1 << 0;
        const COMPLETE = 1 << 1;
        const REMASTER = 1 << 2;
        const UNCENSORED = 1 << 3;
        const UNCUT = 1 << 4;
        const DUBBED = 1 << 5;
    }
}

/// An inclusive episode range, e.g. `01-12` in a batch release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRange {
    pub first: u32,
    pub last: u32,
}

/// Parsed elements extracted from a release name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Elements {
    /// The anime title. A parenthesised alternate name directly after the
    /// title is kept, e.g. `"Sousou no Frieren (Frieren)"`.
    pub title: Option<String>,
    /// Episode number as written ("05", "12v2").
    pub episode: Option<String>,
    /// Episode number parsed as u32 when possible.
    pub episode_number: Option<u32>,
    /// Explicit episode range, present on most batch releases.
    pub episode_range: Option<EpisodeRange>,
    /// Release group name (e.g., "SubsPlease").
    pub release_group: Option<String>,
    /// Video resolution (e.g., "1080p", "720p").
    pub resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Source (e.g., "BD", "WEB").
    pub source: Option<String>,
    /// File checksum (e.g., "ABCD1234").
    pub checksum: Option<String>,
    /// Release-type markers.
    pub release: ReleaseFlags,
}

impl Elements {
    /// Whether the release is tagged as a multi-episode bundle.
    pub fn is_batch(&self) -> bool {
        self.release
            .intersects(ReleaseFlags::BATCH | ReleaseFlags::COMPLETE)
    }
}
