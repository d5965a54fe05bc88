use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::traits::{AiringEpisode, MediaStatus, MediaTitle, WatchingEntry};

// ── GraphQL response wrappers ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQLError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

// ── Watching list ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MediaListCollectionResponse {
    #[serde(rename = "MediaListCollection")]
    pub media_list_collection: MediaListCollection,
}

#[derive(Debug, Deserialize)]
pub struct MediaListCollection {
    pub lists: Vec<MediaListGroup>,
}

#[derive(Debug, Deserialize)]
pub struct MediaListGroup {
    pub entries: Vec<MediaListEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MediaListEntry {
    #[serde(rename = "mediaId")]
    pub media_id: u64,
    #[serde(default)]
    pub progress: Option<u32>,
    pub media: AniListMedia,
}

#[derive(Debug, Deserialize)]
pub struct AniListMedia {
    pub id: u64,
    pub title: Option<AniListTitle>,
    pub synonyms: Option<Vec<String>>,
    pub status: Option<String>,
    pub episodes: Option<u32>,
    pub format: Option<String>,
    pub genres: Option<Vec<String>>,
    #[serde(rename = "nextAiringEpisode")]
    pub next_airing_episode: Option<NextAiringEpisode>,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<CoverImage>,
}

#[derive(Debug, Deserialize)]
pub struct AniListTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NextAiringEpisode {
    pub episode: u32,
}

#[derive(Debug, Deserialize)]
pub struct CoverImage {
    #[serde(rename = "extraLarge")]
    pub extra_large: Option<String>,
    pub large: Option<String>,
}

// ── Airing schedule ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AiringMediaResponse {
    #[serde(rename = "Media")]
    pub media: AiringMedia,
}

#[derive(Debug, Deserialize)]
pub struct AiringMedia {
    #[serde(rename = "airingSchedule")]
    pub airing_schedule: AiringScheduleConnection,
}

#[derive(Debug, Deserialize)]
pub struct AiringScheduleConnection {
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    pub nodes: Vec<AiringNode>,
}

#[derive(Debug, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub struct AiringNode {
    pub episode: u32,
    /// Unix timestamp in seconds.
    #[serde(rename = "airingAt")]
    pub airing_at: i64,
}

// ── Conversions ──────────────────────────────────────────────────

impl MediaListEntry {
    pub fn into_watching_entry(self) -> WatchingEntry {
        let m = self.media;
        let title = m.title.map_or_else(MediaTitle::default, |t| MediaTitle {
            romaji: t.romaji,
            english: t.english,
            native: t.native,
        });
        WatchingEntry {
            media_id: self.media_id,
            progress: self.progress.unwrap_or(0),
            title,
            synonyms: m.synonyms.unwrap_or_default(),
            status: m.status.as_deref().and_then(MediaStatus::parse),
            episodes: m.episodes,
            next_airing_episode: m.next_airing_episode.map(|n| n.episode),
            genres: m.genres.unwrap_or_default(),
            format: m.format,
            cover_url: m.cover_image.and_then(|c| c.extra_large.or(c.large)),
        }
    }
}

impl AiringNode {
    pub fn into_airing_episode(self) -> Option<AiringEpisode> {
        let airing_at = DateTime::<Utc>::from_timestamp(self.airing_at, 0)?;
        Some(AiringEpisode {
            episode: self.episode,
            airing_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watching_entry_conversion() {
        let json = serde_json::json!({
            "data": {
                "MediaListCollection": {
                    "lists": [{
                        "entries": [{
                            "mediaId": 154587,
                            "progress": 5,
                            "media": {
                                "id": 154587,
                                "title": {
                                    "romaji": "Sousou no Frieren",
                                    "english": "Frieren: Beyond Journey's End",
                                    "native": null
                                },
                                "synonyms": ["Frieren"],
                                "status": "RELEASING",
                                "episodes": 28,
                                "format": "TV",
                                "genres": ["Adventure", "Fantasy"],
                                "nextAiringEpisode": { "episode": 9 },
                                "coverImage": { "extraLarge": null, "large": "https://img/large.jpg" }
                            }
                        }]
                    }]
                }
            }
        });

        let resp: GraphQLResponse<MediaListCollectionResponse> =
            serde_json::from_value(json).unwrap();
        let entry = resp
            .data
            .unwrap()
            .media_list_collection
            .lists
            .into_iter()
            .flat_map(|g| g.entries)
            .next()
            .unwrap()
            .into_watching_entry();

        assert_eq!(entry.media_id, 154587);
        assert_eq!(entry.progress, 5);
        assert_eq!(entry.title.romaji.as_deref(), Some("Sousou no Frieren"));
        assert_eq!(entry.status, Some(MediaStatus::Releasing));
        assert_eq!(entry.next_airing_episode, Some(9));
        assert_eq!(entry.cover_url.as_deref(), Some("https://img/large.jpg"));
        assert_eq!(entry.synonyms, vec!["Frieren".to_string()]);
    }

    #[test]
    fn test_errors_without_data() {
        let json = serde_json::json!({
            "data": null,
            "errors": [{ "message": "User not found", "status": 404 }]
        });
        let resp: GraphQLResponse<MediaListCollectionResponse> =
            serde_json::from_value(json).unwrap();
        assert!(resp.data.is_none());
        assert_eq!(resp.errors[0].message, "User not found");
    }

    #[test]
    fn test_airing_node_conversion() {
        let node = AiringNode {
            episode: 7,
            airing_at: 1_700_000_000,
        };
        let ep = node.into_airing_episode().unwrap();
        assert_eq!(ep.episode, 7);
        assert_eq!(ep.airing_at.timestamp(), 1_700_000_000);
    }
}
