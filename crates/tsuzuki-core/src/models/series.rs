use serde::{Deserialize, Serialize};
use tsuzuki_api::{MediaStatus, WatchingEntry};

/// A series from the watching list, rebuilt every cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesTarget {
    pub media_id: u64,
    /// Romaji title, or the first other title AniList has.
    pub title: String,
    pub english: Option<String>,
    pub synonyms: Vec<String>,
    /// Episodes watched.
    pub progress: u32,
    pub status: Option<MediaStatus>,
    pub total_episodes: Option<u32>,
    pub next_airing_episode: Option<u32>,
    /// Searched on the restricted feed.
    pub restricted: bool,
    pub cover_url: Option<String>,
}

impl SeriesTarget {
    /// Returns `None` for entries without any usable title.
    pub fn from_entry(entry: &WatchingEntry, restricted_genre: Option<&str>) -> Option<Self> {
        let title = [
            &entry.title.romaji,
            &entry.title.english,
            &entry.title.native,
        ]
        .into_iter()
        .flatten()
        .map(|t| t.trim())
        .find(|t| !t.is_empty())?
        .to_string();

        let restricted = restricted_genre.is_some_and(|genre| {
            entry.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
        });

        Some(Self {
            media_id: entry.media_id,
            title,
            english: entry.title.english.clone().filter(|t| !t.trim().is_empty()),
            synonyms: entry.synonyms.clone(),
            progress: entry.progress,
            status: entry.status,
            total_episodes: entry.episodes,
            next_airing_episode: entry.next_airing_episode,
            restricted,
            cover_url: entry.cover_url.clone(),
        })
    }

    /// Last episode that has aired: next-airing minus one while releasing,
    /// otherwise the total count.
    pub fn latest_episode(&self) -> u32 {
        match self.next_airing_episode {
            Some(next) => next.saturating_sub(1),
            None => self.total_episodes.unwrap_or(0),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == Some(MediaStatus::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsuzuki_api::MediaTitle;

    fn entry() -> WatchingEntry {
        WatchingEntry {
            media_id: 1,
            progress: 2,
            title: MediaTitle {
                romaji: None,
                english: Some("Frieren".into()),
                native: None,
            },
            synonyms: vec![],
            status: Some(MediaStatus::Releasing),
            episodes: Some(28),
            next_airing_episode: Some(9),
            genres: vec!["Adventure".into(), "Hentai".into()],
            format: None,
            cover_url: None,
        }
    }

    #[test]
    fn test_title_falls_back_to_english() {
        let target = SeriesTarget::from_entry(&entry(), None).unwrap();
        assert_eq!(target.title, "Frieren");
    }

    #[test]
    fn test_no_title_is_skipped() {
        let mut e = entry();
        e.title = MediaTitle::default();
        assert!(SeriesTarget::from_entry(&e, None).is_none());
    }

    #[test]
    fn test_latest_episode() {
        let mut target = SeriesTarget::from_entry(&entry(), None).unwrap();
        assert_eq!(target.latest_episode(), 8);
        target.next_airing_episode = None;
        assert_eq!(target.latest_episode(), 28);
        target.total_episodes = None;
        assert_eq!(target.latest_episode(), 0);
    }

    #[test]
    fn test_restricted_genre() {
        assert!(SeriesTarget::from_entry(&entry(), Some("hentai")).unwrap().restricted);
        assert!(!SeriesTarget::from_entry(&entry(), Some("Ecchi")).unwrap().restricted);
        assert!(!SeriesTarget::from_entry(&entry(), None).unwrap().restricted);
    }
}
