use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook error (status {status}): {message}")]
    Status { status: u16, message: String },
}
