use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::Client;

use super::error::AniListError;
use super::types::{AiringMediaResponse, GraphQLResponse, MediaListCollectionResponse};
use crate::traits::{AiringEpisode, MetadataProvider, WatchingEntry};

const API_URL: &str = "https://graphql.anilist.co";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const WATCHING_QUERY: &str = r#"
query ($userName: String) {
    MediaListCollection(userName: $userName, type: ANIME, status_in: [CURRENT]) {
        lists {
            entries {
                mediaId
                progress
                media {
                    id
                    title { romaji english native }
                    synonyms
                    status
                    episodes
                    format
                    genres
                    nextAiringEpisode { episode }
                    coverImage { extraLarge large }
                }
            }
        }
    }
}
"#;

const AIRING_SCHEDULE_QUERY: &str = r#"
query ($mediaId: Int, $page: Int) {
    Media(id: $mediaId, type: ANIME) {
        airingSchedule(page: $page, perPage: 25) {
            pageInfo { hasNextPage }
            nodes { episode airingAt }
        }
    }
}
"#;

/// AniList GraphQL API client.
///
/// Reads the public list of `user_name`. A token is only needed for
/// private lists.
pub struct AniListClient {
    user_name: String,
    access_token: Option<String>,
    endpoint: String,
    http: Client,
}

impl AniListClient {
    pub fn new(
        user_name: impl Into<String>,
        access_token: Option<String>,
        proxy: Option<&str>,
    ) -> Result<Self, AniListError> {
        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            user_name: user_name.into(),
            access_token,
            endpoint: API_URL.to_string(),
            http: builder.build()?,
        })
    }

    /// Point the client at a different GraphQL endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn graphql_request<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, AniListError> {
        tracing::debug!(operation, "AniList GraphQL request");

        let mut req = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .json(&serde_json::json!({
                "query": query,
                "variables": variables,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(operation, status = status_code, "AniList API error");
            return Err(AniListError::Api {
                status: status_code,
                message: body,
            });
        }

        tracing::debug!(operation, status = %status, "AniList response received");
        let body: GraphQLResponse<T> = resp
            .json()
            .await
            .map_err(|e| AniListError::Parse(e.to_string()))?;

        match body.data {
            Some(data) => Ok(data),
            None => {
                let message = body
                    .errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                tracing::warn!(operation, %message, "AniList returned no data");
                Err(AniListError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

impl MetadataProvider for AniListClient {
    type Error = AniListError;

    async fn watching_list(&self) -> Result<Vec<WatchingEntry>, AniListError> {
        let resp: MediaListCollectionResponse = self
            .graphql_request(
                "WatchingList",
                WATCHING_QUERY,
                serde_json::json!({ "userName": self.user_name }),
            )
            .await?;

        let entries: Vec<WatchingEntry> = resp
            .media_list_collection
            .lists
            .into_iter()
            .flat_map(|group| group.entries)
            .map(|entry| entry.into_watching_entry())
            .collect();

        tracing::debug!(count = entries.len(), "watching list fetched");
        Ok(entries)
    }

    async fn airing_schedule(
        &self,
        media_id: u64,
        episodes: &[u32],
    ) -> Result<Vec<AiringEpisode>, AniListError> {
        let mut wanted: BTreeSet<u32> = episodes.iter().copied().collect();
        let mut found = Vec::new();
        let mut page = 1u32;

        while !wanted.is_empty() {
            let resp: AiringMediaResponse = self
                .graphql_request(
                    "AiringSchedule",
                    AIRING_SCHEDULE_QUERY,
                    serde_json::json!({ "mediaId": media_id, "page": page }),
                )
                .await?;
            let schedule = resp.media.airing_schedule;

            for node in schedule.nodes {
                if wanted.remove(&node.episode) {
                    found.extend(node.into_airing_episode());
                }
            }

            if !schedule.page_info.has_next_page {
                break;
            }
            page += 1;
        }

        if !wanted.is_empty() {
            tracing::debug!(media_id, missing = ?wanted, "no air time for some episodes");
        }
        found.sort_by_key(|e| e.episode);
        Ok(found)
    }
}
