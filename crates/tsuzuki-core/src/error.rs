use thiserror::Error;

#[derive(Debug, Error)]
pub enum TsuzukiError {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("database actor error: {0}")]
    Database(String),

    #[error("feed error: {0}")]
    Feed(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
