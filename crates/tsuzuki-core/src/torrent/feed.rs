use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::TsuzukiError;
use crate::models::Candidate;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A searchable torrent feed.
pub trait FeedSource: Send + Sync {
    /// Run one search. Any failure is reported as `None`.
    ///
    /// Returned candidates have at least one seeder and are sorted by
    /// seeders, highest first.
    fn search(&self, url: &Url) -> impl Future<Output = Option<Vec<Candidate>>> + Send;
}

/// Nyaa RSS search over HTTP.
pub struct NyaaFeed {
    http: reqwest::Client,
}

impl NyaaFeed {
    pub fn new(proxy: Option<&str>) -> Result<Self, TsuzukiError> {
        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| TsuzukiError::Config(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| TsuzukiError::Feed(format!("HTTP client: {e}")))?;
        Ok(Self { http })
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<Candidate>, TsuzukiError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TsuzukiError::Feed(format!("fetch: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TsuzukiError::Feed(format!("HTTP status {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TsuzukiError::Feed(format!("read: {e}")))?;
        parse_feed(&bytes)
    }
}

impl FeedSource for NyaaFeed {
    async fn search(&self, url: &Url) -> Option<Vec<Candidate>> {
        match self.fetch(url).await {
            Ok(items) => {
                tracing::debug!(url = %url, count = items.len(), "feed searched");
                Some(items)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "feed search failed");
                None
            }
        }
    }
}

/// Parse a Nyaa RSS document into seeded candidates, most seeders first.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Candidate>, TsuzukiError> {
    let channel =
        rss::Channel::read_from(bytes).map_err(|e| TsuzukiError::Feed(format!("parse: {e}")))?;

    let mut items: Vec<Candidate> = channel
        .items()
        .iter()
        .filter_map(|rss_item: &rss::Item| {
            // Nyaa uses nyaa:seeders, nyaa:size, nyaa:infoHash in the
            // RSS extensions namespace.
            let nyaa = rss_item.extensions().get("nyaa");
            let nyaa_field = |name: &str| -> Option<String> {
                nyaa?.get(name)?.first()?.value().map(|s| s.to_string())
            };

            let link = rss_item.link()?.to_string();
            let title = rss_item.title()?.to_string();
            let guid = rss_item
                .guid()
                .map(|g| g.value().to_string())
                .unwrap_or_else(|| link.clone());

            let seeders: u32 = nyaa_field("seeders")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0);

            let pub_date: Option<DateTime<Utc>> = rss_item
                .pub_date()
                .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
                .map(|dt| dt.with_timezone(&Utc));

            Some(Candidate {
                guid,
                title,
                link,
                pub_date,
                seeders,
                size: nyaa_field("size"),
                info_hash: nyaa_field("infoHash"),
            })
        })
        .filter(|c| c.seeders > 0)
        .collect();

    items.sort_by(|a, b| b.seeders.cmp(&a.seeders));
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss xmlns:atom="http://www.w3.org/2005/Atom" xmlns:nyaa="https://nyaa.si/xmlns/nyaa" version="2.0">
  <channel>
    <title>Nyaa - "show name" - Torrent File RSS</title>
    <link>https://nyaa.si/</link>
    <description>RSS Feed for "show name"</description>
    <item>
      <title>[GroupA] Show Name - 07 [720p].mkv</title>
      <link>https://nyaa.si/download/100.torrent</link>
      <guid isPermaLink="true">https://nyaa.si/view/100</guid>
      <pubDate>Sat, 11 May 2024 15:32:00 -0000</pubDate>
      <nyaa:seeders>12</nyaa:seeders>
      <nyaa:infoHash>aaaa</nyaa:infoHash>
      <nyaa:size>350.1 MiB</nyaa:size>
    </item>
    <item>
      <title>[GroupB] Show Name - 07 [1080p].mkv</title>
      <link>https://nyaa.si/download/101.torrent</link>
      <guid isPermaLink="true">https://nyaa.si/view/101</guid>
      <pubDate>Sat, 11 May 2024 15:40:00 -0000</pubDate>
      <nyaa:seeders>250</nyaa:seeders>
      <nyaa:infoHash>bbbb</nyaa:infoHash>
      <nyaa:size>1.4 GiB</nyaa:size>
    </item>
    <item>
      <title>[Dead] Show Name - 07 [1080p].mkv</title>
      <link>https://nyaa.si/download/102.torrent</link>
      <guid isPermaLink="true">https://nyaa.si/view/102</guid>
      <pubDate>Sat, 11 May 2024 16:00:00 -0000</pubDate>
      <nyaa:seeders>0</nyaa:seeders>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_sorts_and_drops_unseeded() {
        let items = parse_feed(SAMPLE.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].seeders, 250);
        assert_eq!(items[0].title, "[GroupB] Show Name - 07 [1080p].mkv");
        assert_eq!(items[0].link, "https://nyaa.si/download/101.torrent");
        assert_eq!(items[0].guid, "https://nyaa.si/view/101");
        assert_eq!(items[0].info_hash.as_deref(), Some("bbbb"));
        assert_eq!(items[0].size.as_deref(), Some("1.4 GiB"));
        assert_eq!(items[1].seeders, 12);
        assert!(items[0].pub_date.is_some());
    }

    #[test]
    fn test_parse_garbage_is_an_error() {
        assert!(parse_feed(b"<html>not rss</html>").is_err());
    }

    #[test]
    fn test_empty_channel() {
        let xml = r#"<rss version="2.0"><channel><title>t</title><link>l</link><description>d</description></channel></rss>"#;
        assert!(parse_feed(xml.as_bytes()).unwrap().is_empty());
    }
}
