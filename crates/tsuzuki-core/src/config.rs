use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TsuzukiError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub anilist: AniListConfig,
    pub feed: FeedConfig,
    pub matching: MatchingConfig,
    pub qbittorrent: QbitConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub check_interval_minutes: u64,
    pub max_concurrent_series: usize,
    pub request_delay_ms: u64,
    /// 0 disables the periodic reset.
    pub reset_state_hours: u64,
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AniListConfig {
    pub user_name: String,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub default_url: String,
    pub restricted_url: String,
    pub restricted_genre: Option<String>,
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub threshold: f64,
    pub backoff_step: u32,
    pub backoff_ceiling: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QbitConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub root_dir: String,
    pub link_mirror: Option<String>,
    pub mirror_source_host: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub discord_webhook: Option<String>,
    pub username: Option<String>,
}

impl AppConfig {
    /// Load config: the user file (if any) merged key by key over the built-in defaults.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, TsuzukiError> {
        let mut merged = parse_table(DEFAULT_CONFIG)?;

        let user_path = match path {
            Some(p) if !p.exists() => {
                return Err(TsuzukiError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )))
            }
            Some(p) => Some(p.to_path_buf()),
            None => Some(Self::config_path()).filter(|p| p.exists()),
        };

        if let Some(user_path) = user_path {
            tracing::debug!(path = %user_path.display(), "loading user config");
            let user_str = std::fs::read_to_string(&user_path)?;
            merge_tables(&mut merged, parse_table(&user_str)?);
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| TsuzukiError::Config(e.to_string()))
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), TsuzukiError> {
        let fail = |msg: String| Err(TsuzukiError::Config(msg));

        if self.anilist.user_name.trim().is_empty() {
            return fail("anilist.user_name is required".into());
        }
        if self.general.max_concurrent_series == 0 {
            return fail("general.max_concurrent_series must be at least 1".into());
        }
        if self.general.check_interval_minutes == 0 {
            return fail("general.check_interval_minutes must be at least 1".into());
        }
        if !(self.matching.threshold > 0.0 && self.matching.threshold <= 4.0) {
            return fail(format!(
                "matching.threshold must be in (0, 4], got {}",
                self.matching.threshold
            ));
        }
        for (key, value) in [
            ("feed.default_url", &self.feed.default_url),
            ("feed.restricted_url", &self.feed.restricted_url),
            ("qbittorrent.url", &self.qbittorrent.url),
        ] {
            if let Err(e) = Url::parse(value) {
                return fail(format!("{key} is not a valid URL ({value}): {e}"));
            }
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.general.check_interval_minutes * 60)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.general.request_delay_ms)
    }

    /// Resolution every default-feed release must carry. `None` when the
    /// setting is empty or `"any"`.
    pub fn required_resolution(&self) -> Option<&str> {
        self.feed
            .resolution
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case("any"))
    }

    /// `None` when the periodic reset is disabled.
    pub fn reset_interval(&self) -> Option<Duration> {
        (self.general.reset_state_hours > 0)
            .then(|| Duration::from_secs(self.general.reset_state_hours * 3600))
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Path to the database file.
    pub fn db_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("tsuzuki.db"))
            .unwrap_or_else(|| PathBuf::from("tsuzuki.db"))
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path() -> Result<PathBuf, TsuzukiError> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    /// Directory for rolling log files.
    pub fn log_dir() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "tsuzuki")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

fn parse_table(s: &str) -> Result<toml::Table, TsuzukiError> {
    s.parse::<toml::Table>()
        .map_err(|e| TsuzukiError::Config(e.to_string()))
}

/// Overlay `user` onto `base`, recursing into sub-tables.
fn merge_tables(base: &mut toml::Table, user: toml::Table) {
    for (key, value) in user {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_sub)), toml::Value::Table(user_sub)) => {
                merge_tables(base_sub, user_sub);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
