use tsuzuki_api::MediaStatus;
use url::Url;

use crate::error::TsuzukiError;
use crate::normalize::clean_query;

/// One query for the whole range, or one query per episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Batch,
    Episode,
}

/// Batch only for a finished series the user has not started and nothing
/// has been downloaded for.
pub fn plan_mode(status: Option<MediaStatus>, start: u32, nothing_downloaded: bool) -> SearchMode {
    if status == Some(MediaStatus::Finished) && start == 0 && nothing_downloaded {
        SearchMode::Batch
    } else {
        SearchMode::Episode
    }
}

/// `"Title 07"`.
pub fn episode_query(title: &str, episode: u32) -> String {
    format!("{} {episode:02}", clean_query(title))
}

pub fn batch_query(title: &str) -> String {
    clean_query(title)
}

/// Which feed a series is searched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEndpoint {
    Default,
    /// Genre-restricted content.
    Restricted,
}

impl FeedEndpoint {
    pub fn category(self) -> &'static str {
        match self {
            Self::Default => "1_2",
            Self::Restricted => "1_1",
        }
    }

    /// The restricted feed does not tag resolutions reliably.
    pub fn filters_resolution(self) -> bool {
        matches!(self, Self::Default)
    }
}

/// Base URLs of both feeds.
#[derive(Debug, Clone)]
pub struct FeedEndpoints {
    pub default: Url,
    pub restricted: Url,
}

impl FeedEndpoints {
    pub fn parse(default: &str, restricted: &str) -> Result<Self, TsuzukiError> {
        let parse = |s: &str| {
            Url::parse(s).map_err(|e| TsuzukiError::Config(format!("invalid feed URL {s}: {e}")))
        };
        Ok(Self {
            default: parse(default)?,
            restricted: parse(restricted)?,
        })
    }

    pub fn base(&self, endpoint: FeedEndpoint) -> &Url {
        match endpoint {
            FeedEndpoint::Default => &self.default,
            FeedEndpoint::Restricted => &self.restricted,
        }
    }
}

/// A search against one feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub endpoint: FeedEndpoint,
    pub query: String,
}

impl FeedRequest {
    pub fn new(endpoint: FeedEndpoint, query: impl Into<String>) -> Self {
        Self {
            endpoint,
            query: query.into(),
        }
    }

    /// Full RSS search URL. Existing query parameters on the base are replaced.
    pub fn url(&self, endpoints: &FeedEndpoints) -> Url {
        let mut url = endpoints.base(self.endpoint).clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("page", "rss")
            .append_pair("q", &self.query)
            .append_pair("c", self.endpoint.category())
            .append_pair("f", "0")
            .append_pair("o", "desc")
            .append_pair("s", "seeders");
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> FeedEndpoints {
        FeedEndpoints::parse("https://nyaa.si/", "https://sukebei.nyaa.si/").unwrap()
    }

    #[test]
    fn test_plan_mode() {
        let finished = Some(MediaStatus::Finished);
        assert_eq!(plan_mode(finished, 0, true), SearchMode::Batch);
        assert_eq!(plan_mode(finished, 3, true), SearchMode::Episode);
        assert_eq!(plan_mode(finished, 0, false), SearchMode::Episode);
        assert_eq!(
            plan_mode(Some(MediaStatus::Releasing), 0, true),
            SearchMode::Episode
        );
        assert_eq!(plan_mode(None, 0, true), SearchMode::Episode);
    }

    #[test]
    fn test_episode_query_is_zero_padded() {
        assert_eq!(episode_query("Show Name", 7), "Show Name 07");
        assert_eq!(episode_query("Show  Name ", 112), "Show Name 112");
    }

    #[test]
    fn test_default_url() {
        let url = FeedRequest::new(FeedEndpoint::Default, "Show Name 07").url(&endpoints());
        assert_eq!(
            url.as_str(),
            "https://nyaa.si/?page=rss&q=Show+Name+07&c=1_2&f=0&o=desc&s=seeders"
        );
    }

    #[test]
    fn test_restricted_url_category() {
        let url = FeedRequest::new(FeedEndpoint::Restricted, "x").url(&endpoints());
        assert_eq!(url.host_str(), Some("sukebei.nyaa.si"));
        assert!(url.query_pairs().any(|(k, v)| k == "c" && v == "1_1"));
    }

    #[test]
    fn test_reserved_characters_are_encoded() {
        let query = "Show & Tell #1 ?=/% 05";
        let url = FeedRequest::new(FeedEndpoint::Default, query).url(&endpoints());
        let q = url
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned());
        assert_eq!(q.as_deref(), Some(query));
        assert_eq!(url.query_pairs().count(), 6);
    }

    #[test]
    fn test_resolution_filter_by_endpoint() {
        assert!(FeedEndpoint::Default.filters_resolution());
        assert!(!FeedEndpoint::Restricted.filters_resolution());
    }
}
