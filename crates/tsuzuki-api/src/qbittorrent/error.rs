use thiserror::Error;

/// Errors from the qBittorrent WebUI client.
#[derive(Debug, Error)]
pub enum QbitError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid WebUI URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("login rejected: {0}")]
    Auth(String),

    #[error("torrent rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
}
