use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tsuzuki_api::MediaStatus;

use crate::error::TsuzukiError;

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");

/// SQLite-backed storage for tracked series.
pub struct Storage {
    conn: Connection,
}

/// Persisted state of one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRecord {
    pub media_id: u64,
    pub title: String,
    /// Manual or auto-discovered search title.
    pub alternative_title: Option<String>,
    /// Offset added to episode numbers for series that continue another
    /// season's numbering.
    pub starting_episode: u32,
    pub status: Option<MediaStatus>,
    pub next_airing_episode: Option<u32>,
    pub downloaded: BTreeSet<u32>,
    pub updated_at: DateTime<Utc>,
}

impl SeriesRecord {
    pub fn new(media_id: u64, title: impl Into<String>) -> Self {
        Self {
            media_id,
            title: title.into(),
            alternative_title: None,
            starting_episode: 0,
            status: None,
            next_airing_episode: None,
            downloaded: BTreeSet::new(),
            updated_at: Utc::now(),
        }
    }
}

impl Storage {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, TsuzukiError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, TsuzukiError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    // ── Series ──────────────────────────────────────────────────

    pub fn get_series(&self, media_id: u64) -> Result<Option<SeriesRecord>, TsuzukiError> {
        let record = self
            .conn
            .query_row(
                "SELECT media_id, title, alternative_title, starting_episode, status,
                 next_airing_episode, updated_at
                 FROM series WHERE media_id = ?1",
                params![media_id as i64],
                row_to_record,
            )
            .optional()?;

        match record {
            Some(mut record) => {
                record.downloaded = self.downloaded_episodes(media_id)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Fetch the record, creating it the first time a series is seen.
    pub fn ensure_series(
        &self,
        media_id: u64,
        title: &str,
        status: Option<MediaStatus>,
        next_airing_episode: Option<u32>,
    ) -> Result<SeriesRecord, TsuzukiError> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO series
             (media_id, title, status, next_airing_episode, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                media_id as i64,
                title,
                status.map(MediaStatus::as_str),
                next_airing_episode,
                now
            ],
        )?;
        if inserted > 0 {
            tracing::debug!(media_id, title, "new series record");
        }
        self.get_series(media_id)?
            .ok_or_else(|| TsuzukiError::Database(format!("series {media_id} vanished")))
    }

    /// Add downloaded episodes (union) and refresh airing info.
    pub fn record_downloads(
        &mut self,
        media_id: u64,
        episodes: &[u32],
        source_title: &str,
        status: Option<MediaStatus>,
        next_airing_episode: Option<u32>,
    ) -> Result<(), TsuzukiError> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO downloaded_episodes
                 (media_id, episode, source_title, downloaded_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for episode in episodes {
                stmt.execute(params![media_id as i64, episode, source_title, now])?;
            }
        }
        tx.execute(
            "UPDATE series SET status = ?2, next_airing_episode = ?3, updated_at = ?4
             WHERE media_id = ?1",
            params![
                media_id as i64,
                status.map(MediaStatus::as_str),
                next_airing_episode,
                now
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Returns `false` if the series is unknown.
    pub fn set_alternative_title(
        &self,
        media_id: u64,
        title: Option<&str>,
    ) -> Result<bool, TsuzukiError> {
        let changed = self.conn.execute(
            "UPDATE series SET alternative_title = ?2, updated_at = ?3 WHERE media_id = ?1",
            params![media_id as i64, title, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Returns `false` if the series is unknown.
    pub fn set_starting_episode(&self, media_id: u64, episode: u32) -> Result<bool, TsuzukiError> {
        let changed = self.conn.execute(
            "UPDATE series SET starting_episode = ?2, updated_at = ?3 WHERE media_id = ?1",
            params![media_id as i64, episode, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Delete a series and its download history.
    pub fn delete_series(&self, media_id: u64) -> Result<bool, TsuzukiError> {
        let changed = self.conn.execute(
            "DELETE FROM series WHERE media_id = ?1",
            params![media_id as i64],
        )?;
        Ok(changed > 0)
    }

    pub fn all_series(&self) -> Result<Vec<SeriesRecord>, TsuzukiError> {
        let mut stmt = self.conn.prepare(
            "SELECT media_id, title, alternative_title, starting_episode, status,
             next_airing_episode, updated_at
             FROM series ORDER BY title COLLATE NOCASE",
        )?;
        let mut records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut downloaded: BTreeMap<u64, BTreeSet<u32>> = BTreeMap::new();
        let mut stmt = self
            .conn
            .prepare("SELECT media_id, episode FROM downloaded_episodes")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)? as u64, row.get::<_, u32>(1)?))
        })?;
        for row in rows {
            let (media_id, episode) = row?;
            downloaded.entry(media_id).or_default().insert(episode);
        }

        for record in &mut records {
            if let Some(eps) = downloaded.remove(&record.media_id) {
                record.downloaded = eps;
            }
        }
        Ok(records)
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<(), TsuzukiError> {
        Ok(self.conn.execute_batch(sql)?)
    }

    fn downloaded_episodes(&self, media_id: u64) -> Result<BTreeSet<u32>, TsuzukiError> {
        let mut stmt = self
            .conn
            .prepare("SELECT episode FROM downloaded_episodes WHERE media_id = ?1")?;
        let episodes = stmt
            .query_map(params![media_id as i64], |row| row.get::<_, u32>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(episodes)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SeriesRecord> {
    let status: Option<String> = row.get(4)?;
    let updated_at: String = row.get(6)?;
    Ok(SeriesRecord {
        media_id: row.get::<_, i64>(0)? as u64,
        title: row.get(1)?,
        alternative_title: row.get(2)?,
        starting_episode: row.get(3)?,
        status: status.as_deref().and_then(MediaStatus::parse),
        next_airing_episode: row.get(5)?,
        downloaded: BTreeSet::new(),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

fn run_migrations(conn: &Connection) -> Result<(), TsuzukiError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}
