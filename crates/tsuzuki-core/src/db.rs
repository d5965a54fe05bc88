use std::path::Path;

use tokio::sync::{mpsc, oneshot};
use tsuzuki_api::MediaStatus;

use crate::error::TsuzukiError;
use crate::storage::{SeriesRecord, Storage};

/// Async handle to a [`Storage`] owned by a dedicated thread.
#[derive(Clone)]
pub struct DbHandle {
    tx: mpsc::UnboundedSender<DbCommand>,
}

type Reply<T> = oneshot::Sender<Result<T, TsuzukiError>>;

enum DbCommand {
    GetSeries {
        media_id: u64,
        reply: Reply<Option<SeriesRecord>>,
    },
    EnsureSeries {
        media_id: u64,
        title: String,
        status: Option<MediaStatus>,
        next_airing_episode: Option<u32>,
        reply: Reply<SeriesRecord>,
    },
    RecordDownloads {
        media_id: u64,
        episodes: Vec<u32>,
        source_title: String,
        status: Option<MediaStatus>,
        next_airing_episode: Option<u32>,
        reply: Reply<()>,
    },
    SetAlternativeTitle {
        media_id: u64,
        title: Option<String>,
        reply: Reply<bool>,
    },
    SetStartingEpisode {
        media_id: u64,
        episode: u32,
        reply: Reply<bool>,
    },
    DeleteSeries {
        media_id: u64,
        reply: Reply<bool>,
    },
    AllSeries {
        reply: Reply<Vec<SeriesRecord>>,
    },
}

impl DbHandle {
    pub fn open(path: &Path) -> Result<Self, TsuzukiError> {
        Self::spawn(Storage::open(path)?)
    }

    /// Move `storage` onto its own thread.
    pub fn spawn(storage: Storage) -> Result<Self, TsuzukiError> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("db-actor".into())
            .spawn(move || actor_loop(storage, rx))?;
        Ok(Self { tx })
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> DbCommand,
    ) -> Result<T, TsuzukiError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| TsuzukiError::Database("DB actor closed".into()))?;
        rx.await
            .unwrap_or_else(|_| Err(TsuzukiError::Database("DB actor closed".into())))
    }

    pub async fn get_series(&self, media_id: u64) -> Result<Option<SeriesRecord>, TsuzukiError> {
        self.request(|reply| DbCommand::GetSeries { media_id, reply })
            .await
    }

    pub async fn ensure_series(
        &self,
        media_id: u64,
        title: impl Into<String>,
        status: Option<MediaStatus>,
        next_airing_episode: Option<u32>,
    ) -> Result<SeriesRecord, TsuzukiError> {
        let title = title.into();
        self.request(|reply| DbCommand::EnsureSeries {
            media_id,
            title,
            status,
            next_airing_episode,
            reply,
        })
        .await
    }

    pub async fn record_downloads(
        &self,
        media_id: u64,
        episodes: Vec<u32>,
        source_title: impl Into<String>,
        status: Option<MediaStatus>,
        next_airing_episode: Option<u32>,
    ) -> Result<(), TsuzukiError> {
        let source_title = source_title.into();
        self.request(|reply| DbCommand::RecordDownloads {
            media_id,
            episodes,
            source_title,
            status,
            next_airing_episode,
            reply,
        })
        .await
    }

    pub async fn set_alternative_title(
        &self,
        media_id: u64,
        title: Option<String>,
    ) -> Result<bool, TsuzukiError> {
        self.request(|reply| DbCommand::SetAlternativeTitle {
            media_id,
            title,
            reply,
        })
        .await
    }

    pub async fn set_starting_episode(
        &self,
        media_id: u64,
        episode: u32,
    ) -> Result<bool, TsuzukiError> {
        self.request(|reply| DbCommand::SetStartingEpisode {
            media_id,
            episode,
            reply,
        })
        .await
    }

    pub async fn delete_series(&self, media_id: u64) -> Result<bool, TsuzukiError> {
        self.request(|reply| DbCommand::DeleteSeries { media_id, reply })
            .await
    }

    pub async fn all_series(&self) -> Result<Vec<SeriesRecord>, TsuzukiError> {
        self.request(|reply| DbCommand::AllSeries { reply }).await
    }
}

fn actor_loop(mut storage: Storage, mut rx: mpsc::UnboundedReceiver<DbCommand>) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            DbCommand::GetSeries { media_id, reply } => {
                let _ = reply.send(storage.get_series(media_id));
            }
            DbCommand::EnsureSeries {
                media_id,
                title,
                status,
                next_airing_episode,
                reply,
            } => {
                let _ = reply.send(storage.ensure_series(
                    media_id,
                    &title,
                    status,
                    next_airing_episode,
                ));
            }
            DbCommand::RecordDownloads {
                media_id,
                episodes,
                source_title,
                status,
                next_airing_episode,
                reply,
            } => {
                let _ = reply.send(storage.record_downloads(
                    media_id,
                    &episodes,
                    &source_title,
                    status,
                    next_airing_episode,
                ));
            }
            DbCommand::SetAlternativeTitle {
                media_id,
                title,
                reply,
            } => {
                let _ = reply.send(storage.set_alternative_title(media_id, title.as_deref()));
            }
            DbCommand::SetStartingEpisode {
                media_id,
                episode,
                reply,
            } => {
                let _ = reply.send(storage.set_starting_episode(media_id, episode));
            }
            DbCommand::DeleteSeries { media_id, reply } => {
                let _ = reply.send(storage.delete_series(media_id));
            }
            DbCommand::AllSeries { reply } => {
                let _ = reply.send(storage.all_series());
            }
        }
    }
    tracing::debug!("DB actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_round_trip() {
        let db = DbHandle::spawn(Storage::open_memory().unwrap()).unwrap();
        let record = db.ensure_series(5, "Show", None, Some(4)).await.unwrap();
        assert_eq!(record.next_airing_episode, Some(4));

        db.record_downloads(5, vec![1, 2, 3], "[G] Show", None, Some(4))
            .await
            .unwrap();
        assert!(db.set_starting_episode(5, 12).await.unwrap());
        assert!(db.set_alternative_title(5, Some("Alt".into())).await.unwrap());

        let record = db.get_series(5).await.unwrap().unwrap();
        assert_eq!(record.downloaded.len(), 3);
        assert_eq!(record.starting_episode, 12);
        assert_eq!(record.alternative_title.as_deref(), Some("Alt"));
        assert_eq!(db.all_series().await.unwrap().len(), 1);

        assert!(db.delete_series(5).await.unwrap());
        assert!(db.get_series(5).await.unwrap().is_none());
    }
}
