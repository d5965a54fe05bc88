use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use tokio::sync::Mutex;
use url::Url;

use super::error::QbitError;
use crate::traits::{DownloadClient, DownloadRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// qBittorrent WebUI (API v2) client.
///
/// Logs in lazily and caches the `SID` cookie. A 403 on add means the
/// session expired, so the client logs in again and retries once.
pub struct QbitClient {
    base: Url,
    username: String,
    password: String,
    root_dir: String,
    link_mirror: Option<(String, String)>,
    sid: Mutex<Option<String>>,
    http: Client,
}

impl QbitClient {
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        root_dir: impl Into<String>,
    ) -> Result<Self, QbitError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            username: username.into(),
            password: password.into(),
            root_dir: root_dir.into(),
            link_mirror: None,
            sid: Mutex::new(None),
            http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
        })
    }

    /// Rewrite links on host `from` to host `to` before adding them.
    pub fn with_link_mirror(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.link_mirror = Some((from.into(), to.into()));
        self
    }

    async fn login(&self) -> Result<String, QbitError> {
        let url = self.base.join("api/v2/auth/login")?;
        tracing::debug!(url = %url, "qBittorrent login");

        let resp = self
            .http
            .post(url)
            .header(header::REFERER, self.base.as_str())
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        let sid = resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(extract_sid);
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        match sid {
            Some(sid) if status.is_success() => Ok(sid),
            _ => {
                tracing::warn!(status = status.as_u16(), %body, "qBittorrent login failed");
                Err(QbitError::Auth(if body.is_empty() {
                    status.to_string()
                } else {
                    body
                }))
            }
        }
    }

    async fn session(&self, refresh: bool) -> Result<String, QbitError> {
        let mut guard = self.sid.lock().await;
        if !refresh {
            if let Some(sid) = guard.as_ref() {
                return Ok(sid.clone());
            }
        }
        let sid = self.login().await?;
        *guard = Some(sid.clone());
        Ok(sid)
    }

    async fn post_add(
        &self,
        sid: &str,
        form: &[(&str, String)],
    ) -> Result<(StatusCode, String), QbitError> {
        let url = self.base.join("api/v2/torrents/add")?;
        let resp = self
            .http
            .post(url)
            .header(header::REFERER, self.base.as_str())
            .header(header::COOKIE, format!("SID={sid}"))
            .form(form)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Ok((status, body))
    }

    fn save_path(&self, folder: &str) -> String {
        format!(
            "{}/{}",
            self.root_dir.trim_end_matches(['/', '\\']),
            sanitize_folder(folder)
        )
    }
}

impl DownloadClient for QbitClient {
    type Error = QbitError;

    async fn add_torrent(&self, request: &DownloadRequest) -> Result<(), QbitError> {
        let link = match &self.link_mirror {
            Some((from, to)) => rewrite_host(&request.link, from, to),
            None => request.link.clone(),
        };

        let mut form = vec![("urls", link), ("savepath", self.save_path(&request.folder))];
        if let Some(label) = &request.label {
            form.push(("rename", label.clone()));
        }

        let sid = self.session(false).await?;
        let (mut status, mut body) = self.post_add(&sid, &form).await?;
        if status == StatusCode::FORBIDDEN {
            tracing::debug!("qBittorrent session expired, logging in again");
            let sid = self.session(true).await?;
            (status, body) = self.post_add(&sid, &form).await?;
        }

        if status.is_success() && body.trim() == "Ok." {
            tracing::info!(folder = %request.folder, label = ?request.label, "torrent added");
            Ok(())
        } else {
            tracing::warn!(status = status.as_u16(), %body, "qBittorrent rejected torrent");
            Err(QbitError::Rejected {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

/// Pull the session id out of a `Set-Cookie` header value.
fn extract_sid(cookie: &str) -> Option<String> {
    cookie
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("SID="))
        .filter(|sid| !sid.is_empty())
        .map(str::to_string)
}

/// Swap the host of `link` when it equals `from`. Unparsable links pass through.
fn rewrite_host(link: &str, from: &str, to: &str) -> String {
    match Url::parse(link) {
        Ok(mut url) if url.host_str() == Some(from) => {
            if url.set_host(Some(to)).is_ok() {
                url.to_string()
            } else {
                link.to_string()
            }
        }
        _ => link.to_string(),
    }
}

/// Strip characters that are not valid in a directory name on common filesystems.
fn sanitize_folder(folder: &str) -> String {
    let cleaned: String = folder
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            c => c,
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sid() {
        assert_eq!(
            extract_sid("SID=abc123; HttpOnly; SameSite=Strict; path=/").as_deref(),
            Some("abc123")
        );
        assert_eq!(extract_sid("QBT_SID=; path=/"), None);
        assert_eq!(extract_sid("other=1"), None);
    }

    #[test]
    fn test_rewrite_host() {
        assert_eq!(
            rewrite_host("https://nyaa.si/download/1234.torrent", "nyaa.si", "nyaa.land"),
            "https://nyaa.land/download/1234.torrent"
        );
        assert_eq!(
            rewrite_host("https://example.org/a.torrent", "nyaa.si", "nyaa.land"),
            "https://example.org/a.torrent"
        );
        assert_eq!(rewrite_host("magnet:?xt=urn:btih:abc", "nyaa.si", "x"), "magnet:?xt=urn:btih:abc");
    }

    #[test]
    fn test_save_path() {
        let client = QbitClient::new("http://localhost:8080", "admin", "pw", "/downloads/anime/")
            .unwrap();
        assert_eq!(client.base.as_str(), "http://localhost:8080/");
        assert_eq!(
            client.save_path("Re:Zero kara Hajimeru"),
            "/downloads/anime/Re Zero kara Hajimeru"
        );
    }

    #[test]
    fn test_base_with_subpath() {
        let client = QbitClient::new("http://host/qbt", "a", "b", "/d").unwrap();
        assert_eq!(
            client.base.join("api/v2/auth/login").unwrap().as_str(),
            "http://host/qbt/api/v2/auth/login"
        );
    }
}
