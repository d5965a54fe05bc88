//! Collaborator interfaces used by the scheduling engine.
//!
//! The engine only talks to the outside world through these traits, so the
//! AniList, qBittorrent and Discord clients can be swapped for fakes in tests.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source of the user's watching list and per-episode air times.
pub trait MetadataProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The user's CURRENT list.
    fn watching_list(
        &self,
    ) -> impl Future<Output = Result<Vec<WatchingEntry>, Self::Error>> + Send;

    /// Air times for the requested episodes of one media entry.
    ///
    /// Episodes the provider has no schedule for are left out of the result.
    fn airing_schedule(
        &self,
        media_id: u64,
        episodes: &[u32],
    ) -> impl Future<Output = Result<Vec<AiringEpisode>, Self::Error>> + Send;
}

/// Something that accepts a torrent link and starts downloading it.
pub trait DownloadClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Hand a link to the client. Adding a link twice must be harmless.
    fn add_torrent(
        &self,
        request: &DownloadRequest,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Fire-and-forget sink for "download started" messages.
pub trait Notifier: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn notify(&self, notice: &DownloadNotice)
        -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// An unconfigured notifier does nothing.
impl<N: Notifier> Notifier for Option<N> {
    type Error = N::Error;

    async fn notify(&self, notice: &DownloadNotice) -> Result<(), N::Error> {
        match self {
            Some(inner) => inner.notify(notice).await,
            None => Ok(()),
        }
    }
}

/// Airing state of a media entry, as reported by AniList.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaStatus {
    Finished,
    Releasing,
    NotYetReleased,
    Cancelled,
    Hiatus,
}

impl MediaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Finished => "FINISHED",
            Self::Releasing => "RELEASING",
            Self::NotYetReleased => "NOT_YET_RELEASED",
            Self::Cancelled => "CANCELLED",
            Self::Hiatus => "HIATUS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FINISHED" => Some(Self::Finished),
            "RELEASING" => Some(Self::Releasing),
            "NOT_YET_RELEASED" => Some(Self::NotYetReleased),
            "CANCELLED" => Some(Self::Cancelled),
            "HIATUS" => Some(Self::Hiatus),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title variants for a media entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

/// One entry of the user's watching list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchingEntry {
    pub media_id: u64,
    /// Episodes watched so far.
    pub progress: u32,
    pub title: MediaTitle,
    pub synonyms: Vec<String>,
    pub status: Option<MediaStatus>,
    /// Total episode count, when known.
    pub episodes: Option<u32>,
    /// Number of the next episode that has not aired yet.
    pub next_airing_episode: Option<u32>,
    pub genres: Vec<String>,
    pub format: Option<String>,
    pub cover_url: Option<String>,
}

/// Air time of a single episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiringEpisode {
    pub episode: u32,
    pub airing_at: DateTime<Utc>,
}

/// A link to hand to the download client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub link: String,
    /// Save folder, relative to the client's download root.
    pub folder: String,
    /// Display name for the added torrent.
    pub label: Option<String>,
}

/// Summary of a dispatched download.
#[derive(Debug, Clone)]
pub struct DownloadNotice {
    pub media_id: u64,
    pub series_title: String,
    pub first_episode: u32,
    /// Set for batch downloads covering more than one episode.
    pub last_episode: Option<u32>,
    pub source_title: String,
    pub seeders: u32,
    pub cover_url: Option<String>,
}

impl DownloadNotice {
    /// `"5"` for one episode, `"1 - 12"` for a range.
    pub fn episode_label(&self) -> String {
        match self.last_episode {
            Some(last) if last != self.first_episode => {
                format!("{} - {}", self.first_episode, last)
            }
            _ => self.first_episode.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(first: u32, last: Option<u32>) -> DownloadNotice {
        DownloadNotice {
            media_id: 1,
            series_title: "Show".into(),
            first_episode: first,
            last_episode: last,
            source_title: "[Group] Show - 01".into(),
            seeders: 10,
            cover_url: None,
        }
    }

    #[test]
    fn test_episode_label() {
        assert_eq!(notice(5, None).episode_label(), "5");
        assert_eq!(notice(1, Some(12)).episode_label(), "1 - 12");
        assert_eq!(notice(3, Some(3)).episode_label(), "3");
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            MediaStatus::Finished,
            MediaStatus::Releasing,
            MediaStatus::NotYetReleased,
            MediaStatus::Cancelled,
            MediaStatus::Hiatus,
        ] {
            assert_eq!(MediaStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MediaStatus::parse("WATCHING"), None);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("never")]
    struct Never;

    struct Counting(std::sync::atomic::AtomicUsize);

    impl Notifier for Counting {
        type Error = Never;

        async fn notify(&self, _notice: &DownloadNotice) -> Result<(), Never> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_optional_notifier() {
        let none: Option<Counting> = None;
        assert!(none.notify(&notice(1, None)).await.is_ok());

        let some = Some(Counting(Default::default()));
        some.notify(&notice(1, None)).await.unwrap();
        assert_eq!(
            some.as_ref()
                .unwrap()
                .0
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }
}
