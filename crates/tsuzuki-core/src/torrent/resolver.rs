use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::feed::FeedSource;
use super::query::{
    batch_query, episode_query, FeedEndpoint, FeedEndpoints, FeedRequest, SearchMode,
};
use super::scorer::{select_best, EpisodeTarget, MatchRequest, ScoredCandidate};

/// Everything needed to look up one series under one title.
#[derive(Debug, Clone)]
pub struct ResolveRequest<'a> {
    pub title: &'a str,
    pub mode: SearchMode,
    /// Exclusive lower bound of the wanted range.
    pub start: u32,
    /// Inclusive upper bound of the wanted range.
    pub end: u32,
    /// Wanted episodes, ascending.
    pub missing: &'a [u32],
    pub endpoint: FeedEndpoint,
    /// Air times keyed by episode number.
    pub air_times: &'a HashMap<u32, DateTime<Utc>>,
}

/// Accepted matches for one lookup.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// One release covering `(start, end]`.
    Batch {
        start: u32,
        end: u32,
        candidate: ScoredCandidate,
    },
    /// One release per episode, ascending.
    Episodes(Vec<(u32, ScoredCandidate)>),
}

/// Runs feed queries and scoring for a series.
pub struct Resolver<'a, F> {
    pub feed: &'a F,
    pub endpoints: &'a FeedEndpoints,
    pub resolution: Option<&'a str>,
    pub threshold: f64,
    pub delay: Duration,
}

impl<F: FeedSource> Resolver<'_, F> {
    /// Find accepted candidates. `None` means nothing cleared the threshold.
    ///
    /// A batch lookup that finds nothing falls back to per-episode queries;
    /// episode mode never goes back to a batch.
    pub async fn resolve(&self, request: &ResolveRequest<'_>) -> Option<Resolution> {
        let resolution = request
            .endpoint
            .filters_resolution()
            .then_some(self.resolution)
            .flatten();

        if request.mode == SearchMode::Batch {
            let match_request = MatchRequest {
                title: request.title,
                resolution,
                target: EpisodeTarget::Range {
                    start: request.start,
                    end: request.end,
                },
                aired_at: request.air_times.get(&request.end).copied(),
            };
            let feed_request = FeedRequest::new(request.endpoint, batch_query(request.title));
            if let Some(candidate) = self.search(&feed_request, &match_request).await {
                tracing::info!(
                    title = request.title,
                    source = %candidate.candidate.title,
                    score = candidate.score.total(),
                    "batch matched"
                );
                return Some(Resolution::Batch {
                    start: request.start,
                    end: request.end,
                    candidate,
                });
            }
            tracing::debug!(title = request.title, "no batch, trying episodes");
            tokio::time::sleep(self.delay).await;
        }

        let mut found = Vec::new();
        for (i, &episode) in request.missing.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }
            let match_request = MatchRequest {
                title: request.title,
                resolution,
                target: EpisodeTarget::Single(episode),
                aired_at: request.air_times.get(&episode).copied(),
            };
            let feed_request =
                FeedRequest::new(request.endpoint, episode_query(request.title, episode));
            match self.search(&feed_request, &match_request).await {
                Some(candidate) => {
                    tracing::info!(
                        title = request.title,
                        episode,
                        source = %candidate.candidate.title,
                        seeders = candidate.candidate.seeders,
                        score = candidate.score.total(),
                        "episode matched"
                    );
                    found.push((episode, candidate));
                }
                None => tracing::debug!(title = request.title, episode, "episode not found"),
            }
        }

        (!found.is_empty()).then_some(Resolution::Episodes(found))
    }

    async fn search(
        &self,
        feed_request: &FeedRequest,
        match_request: &MatchRequest<'_>,
    ) -> Option<ScoredCandidate> {
        let url = feed_request.url(self.endpoints);
        let candidates = self.feed.search(&url).await?;
        select_best(match_request, candidates, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candidate;
    use std::sync::Mutex;
    use url::Url;

    /// Returns canned results keyed by the `q` parameter and records queries.
    #[derive(Default)]
    struct FakeFeed {
        results: HashMap<String, Vec<Candidate>>,
        queries: Mutex<Vec<String>>,
    }

    impl FakeFeed {
        fn with(mut self, query: &str, titles: &[&str]) -> Self {
            let items = titles
                .iter()
                .map(|t| Candidate {
                    guid: t.to_string(),
                    title: t.to_string(),
                    link: format!("https://nyaa.si/download/{}.torrent", t.len()),
                    pub_date: None,
                    seeders: 10,
                    size: None,
                    info_hash: None,
                })
                .collect();
            self.results.insert(query.to_string(), items);
            self
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl FeedSource for FakeFeed {
        async fn search(&self, url: &Url) -> Option<Vec<Candidate>> {
            let q = url
                .query_pairs()
                .find(|(k, _)| k == "q")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            self.queries.lock().unwrap().push(q.clone());
            self.results.get(&q).cloned()
        }
    }

    fn endpoints() -> FeedEndpoints {
        FeedEndpoints::parse("https://nyaa.si/", "https://sukebei.nyaa.si/").unwrap()
    }

    fn resolver<'a>(feed: &'a FakeFeed, endpoints: &'a FeedEndpoints) -> Resolver<'a, FakeFeed> {
        Resolver {
            feed,
            endpoints,
            resolution: Some("1080p"),
            threshold: 3.8,
            delay: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_episode_queries_in_order() {
        let feed = FakeFeed::default().with("Show Name 07", &["Show Name - 07 [1080p]"]);
        let endpoints = endpoints();
        let air_times = HashMap::new();
        let request = ResolveRequest {
            title: "Show Name",
            mode: SearchMode::Episode,
            start: 5,
            end: 8,
            missing: &[6, 7, 8],
            endpoint: FeedEndpoint::Default,
            air_times: &air_times,
        };

        let resolution = resolver(&feed, &endpoints).resolve(&request).await;
        assert_eq!(feed.queries(), vec!["Show Name 06", "Show Name 07", "Show Name 08"]);
        match resolution {
            Some(Resolution::Episodes(found)) => {
                assert_eq!(found.len(), 1);
                assert_eq!(found[0].0, 7);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_then_episode_fallback() {
        let feed = FakeFeed::default()
            .with("Show Name", &["[G] Show Name (01-11) [1080p] [Batch]"])
            .with("Show Name 02", &["[G] Show Name - 02 [1080p]"]);
        let endpoints = endpoints();
        let air_times = HashMap::new();
        let request = ResolveRequest {
            title: "Show Name",
            mode: SearchMode::Batch,
            start: 0,
            end: 3,
            missing: &[1, 2, 3],
            endpoint: FeedEndpoint::Default,
            air_times: &air_times,
        };

        let resolution = resolver(&feed, &endpoints).resolve(&request).await;
        assert_eq!(
            feed.queries(),
            vec!["Show Name", "Show Name 01", "Show Name 02", "Show Name 03"]
        );
        assert!(matches!(resolution, Some(Resolution::Episodes(ref f)) if f[0].0 == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_match() {
        let feed =
            FakeFeed::default().with("Show Name", &["[G] Show Name (01-12) [1080p] [Batch]"]);
        let endpoints = endpoints();
        let air_times = HashMap::new();
        let missing: Vec<u32> = (1..=12).collect();
        let request = ResolveRequest {
            title: "Show Name",
            mode: SearchMode::Batch,
            start: 0,
            end: 12,
            missing: &missing,
            endpoint: FeedEndpoint::Default,
            air_times: &air_times,
        };

        let resolution = resolver(&feed, &endpoints).resolve(&request).await;
        assert_eq!(feed.queries(), vec!["Show Name"]);
        assert!(matches!(resolution, Some(Resolution::Batch { start: 0, end: 12, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restricted_endpoint_ignores_resolution() {
        let feed = FakeFeed::default().with("Show Name 01", &["Show Name - 01"]);
        let endpoints = endpoints();
        let air_times = HashMap::new();
        let request = ResolveRequest {
            title: "Show Name",
            mode: SearchMode::Episode,
            start: 0,
            end: 1,
            missing: &[1],
            endpoint: FeedEndpoint::Restricted,
            air_times: &air_times,
        };

        let resolution = resolver(&feed, &endpoints).resolve(&request).await;
        assert!(matches!(resolution, Some(Resolution::Episodes(_))));
    }
}
