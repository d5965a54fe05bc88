use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use super::error::WebhookError;
use crate::traits::{DownloadNotice, Notifier};

const EMBED_COLOR: u32 = 0x02A9FF;

/// Posts download notices to a Discord channel webhook.
pub struct DiscordWebhook {
    url: String,
    username: Option<String>,
    http: Client,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>, username: Option<String>) -> Result<Self, WebhookError> {
        Ok(Self {
            url: url.into(),
            username,
            http: Client::builder().timeout(Duration::from_secs(10)).build()?,
        })
    }
}

impl Notifier for DiscordWebhook {
    type Error = WebhookError;

    async fn notify(&self, notice: &DownloadNotice) -> Result<(), WebhookError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&build_payload(notice, self.username.as_deref()))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WebhookError::Status {
                status: status.as_u16(),
                message,
            });
        }
        tracing::debug!(media_id = notice.media_id, "webhook notice sent");
        Ok(())
    }
}

fn build_payload(notice: &DownloadNotice, username: Option<&str>) -> Value {
    let mut embed = json!({
        "title": format!("{} is downloading!", notice.series_title),
        "color": EMBED_COLOR,
        "fields": [
            { "name": "Title ID", "value": notice.media_id.to_string(), "inline": true },
            { "name": "Episode(s)", "value": notice.episode_label(), "inline": true },
            { "name": "Seeders", "value": notice.seeders.to_string(), "inline": true },
            { "name": "Title", "value": notice.source_title },
        ],
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    if let Some(cover) = &notice.cover_url {
        embed["image"] = json!({ "url": cover });
    }

    let mut payload = json!({ "embeds": [embed] });
    if let Some(name) = username {
        payload["username"] = json!(name);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_fields() {
        let notice = DownloadNotice {
            media_id: 21,
            series_title: "One Piece".into(),
            first_episode: 1,
            last_episode: Some(12),
            source_title: "[Group] One Piece (01-12) [1080p]".into(),
            seeders: 42,
            cover_url: Some("https://img/cover.jpg".into()),
        };
        let payload = build_payload(&notice, Some("tsuzuki"));
        let embed = &payload["embeds"][0];

        assert_eq!(payload["username"], "tsuzuki");
        assert_eq!(embed["title"], "One Piece is downloading!");
        assert_eq!(embed["fields"][0]["value"], "21");
        assert_eq!(embed["fields"][1]["value"], "1 - 12");
        assert_eq!(embed["fields"][2]["value"], "42");
        assert_eq!(embed["image"]["url"], "https://img/cover.jpg");
    }

    #[test]
    fn test_payload_without_cover() {
        let notice = DownloadNotice {
            media_id: 1,
            series_title: "Show".into(),
            first_episode: 3,
            last_episode: None,
            source_title: "Show - 03".into(),
            seeders: 1,
            cover_url: None,
        };
        let payload = build_payload(&notice, None);
        assert!(payload.get("username").is_none());
        assert!(payload["embeds"][0].get("image").is_none());
    }
}
