//! The polling loop: fetch the watching list, decide which series are due,
//! resolve them under a concurrency cap and hand matches to the download
//! client.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tsuzuki_api::{DownloadClient, DownloadNotice, DownloadRequest, MetadataProvider, Notifier};

use crate::config::AppConfig;
use crate::db::DbHandle;
use crate::episodes::missing_episodes;
use crate::error::TsuzukiError;
use crate::models::SeriesTarget;
use crate::state::{BackoffPolicy, SeriesState, SeriesStore};
use crate::title::TitlePlan;
use crate::torrent::query::plan_mode;
use crate::torrent::{
    FeedEndpoint, FeedEndpoints, FeedSource, Resolution, ResolveRequest, Resolver, ScoredCandidate,
};

/// Tunables for the scheduler, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub max_concurrent: usize,
    pub request_delay: Duration,
    pub threshold: f64,
    pub backoff: BackoffPolicy,
    pub resolution: Option<String>,
    pub restricted_genre: Option<String>,
    pub endpoints: FeedEndpoints,
}

impl SchedulerSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, TsuzukiError> {
        Ok(Self {
            max_concurrent: config.general.max_concurrent_series.max(1),
            request_delay: config.request_delay(),
            threshold: config.matching.threshold,
            backoff: BackoffPolicy {
                step: config.matching.backoff_step,
                ceiling: config.matching.backoff_ceiling,
            },
            resolution: config.required_resolution().map(str::to_string),
            restricted_genre: config.feed.restricted_genre.clone(),
            endpoints: FeedEndpoints::parse(&config.feed.default_url, &config.feed.restricted_url)?,
        })
    }
}

/// What happened to one series in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesOutcome {
    UpToDate,
    /// Skipped without network calls; `remaining` cycles left.
    BackingOff { remaining: u32 },
    Downloaded { episodes: Vec<u32> },
    /// Nothing accepted; retried after `retry_in` cycles.
    NotFound { retry_in: u32 },
    /// Persistence failed; retried next cycle.
    Skipped { reason: String },
}

#[derive(Debug, Clone)]
pub struct SeriesReport {
    pub media_id: u64,
    pub title: String,
    pub outcome: SeriesOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub series: Vec<SeriesReport>,
}

impl CycleReport {
    fn push(&mut self, target: &SeriesTarget, outcome: SeriesOutcome) {
        self.series.push(SeriesReport {
            media_id: target.media_id,
            title: target.title.clone(),
            outcome,
        });
    }

    pub fn outcome(&self, media_id: u64) -> Option<&SeriesOutcome> {
        self.series
            .iter()
            .find(|s| s.media_id == media_id)
            .map(|s| &s.outcome)
    }

    pub fn downloaded_count(&self) -> usize {
        self.series
            .iter()
            .map(|s| match &s.outcome {
                SeriesOutcome::Downloaded { episodes } => episodes.len(),
                _ => 0,
            })
            .sum()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("a cycle is already running")]
    AlreadyRunning,

    #[error("watching list unavailable: {0}")]
    WatchingList(String),
}

/// Clears the running flag when a cycle ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler<M, F, D, N> {
    metadata: M,
    feed: F,
    downloader: D,
    notifier: N,
    db: DbHandle,
    settings: SchedulerSettings,
    store: Mutex<SeriesStore>,
    running: AtomicBool,
}

impl<M, F, D, N> Scheduler<M, F, D, N>
where
    M: MetadataProvider,
    F: FeedSource,
    D: DownloadClient,
    N: Notifier,
{
    pub fn new(
        metadata: M,
        feed: F,
        downloader: D,
        notifier: N,
        db: DbHandle,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            metadata,
            feed,
            downloader,
            notifier,
            db,
            settings,
            store: Mutex::new(SeriesStore::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Forget all in-memory state so every series is looked up again.
    ///
    /// Returns `false` without clearing anything while a cycle is running,
    /// since that cycle still holds the states it took.
    pub async fn reset_state(&self) -> bool {
        let mut store = self.store.lock().await;
        if self.is_running() {
            return false;
        }
        store.clear();
        true
    }

    pub async fn reset_series(&self, media_id: u64) {
        self.store.lock().await.reset(media_id);
    }

    /// Run one full cycle. Refuses to start while another cycle is running.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        if self.running.swap(true, Ordering::AcqRel) {
            tracing::warn!("previous cycle still running, skipping");
            return Err(CycleError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        let entries = self.metadata.watching_list().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to fetch watching list");
            CycleError::WatchingList(e.to_string())
        })?;

        let mut seen = HashSet::new();
        let targets: Vec<SeriesTarget> = entries
            .iter()
            .filter_map(|e| SeriesTarget::from_entry(e, self.settings.restricted_genre.as_deref()))
            .filter(|t| seen.insert(t.media_id))
            .collect();
        tracing::info!(series = targets.len(), "cycle started");

        let mut report = CycleReport::default();
        let mut jobs = Vec::new();
        {
            let mut store = self.store.lock().await;
            for target in targets {
                let mut state = store.take(target.media_id);
                if !state.tick() {
                    tracing::debug!(
                        media_id = target.media_id,
                        remaining = state.timeout,
                        "backing off"
                    );
                    report.push(
                        &target,
                        SeriesOutcome::BackingOff {
                            remaining: state.timeout,
                        },
                    );
                    store.put(target.media_id, state);
                } else if !state.is_due(&target) {
                    report.push(&target, SeriesOutcome::UpToDate);
                    store.put(target.media_id, state);
                } else {
                    jobs.push((target, state));
                }
            }
        }

        let results: Vec<(SeriesTarget, SeriesState, SeriesOutcome)> = stream::iter(jobs)
            .map(|(target, state)| async move {
                let (state, outcome) = self.handle_series(&target, state).await;
                (target, state, outcome)
            })
            .buffer_unordered(self.settings.max_concurrent.max(1))
            .collect()
            .await;

        let mut store = self.store.lock().await;
        for (target, state, outcome) in results {
            store.put(target.media_id, state);
            report.push(&target, outcome);
        }

        tracing::info!(
            series = report.series.len(),
            downloaded = report.downloaded_count(),
            "cycle finished"
        );
        Ok(report)
    }

    async fn handle_series(
        &self,
        target: &SeriesTarget,
        mut state: SeriesState,
    ) -> (SeriesState, SeriesOutcome) {
        let media_id = target.media_id;

        let record = match self
            .db
            .ensure_series(
                media_id,
                target.title.as_str(),
                target.status,
                target.next_airing_episode,
            )
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(media_id, error = %e, "failed to load series record");
                return (
                    state,
                    SeriesOutcome::Skipped {
                        reason: e.to_string(),
                    },
                );
            }
        };
        state.sync(&record);

        let offset = state.starting_offset;
        let start = target.progress + offset;
        let end = target.latest_episode() + offset;
        let missing = missing_episodes(start, end, &state.downloaded);
        if missing.is_empty() {
            tracing::debug!(media_id, title = %target.title, "up to date");
            return (state, SeriesOutcome::UpToDate);
        }
        tracing::info!(media_id, title = %target.title, episodes = ?missing, "searching");

        // The schedule uses AniList numbering; the feed uses offset numbering.
        let schedule_episodes: Vec<u32> = missing.iter().map(|ep| ep - offset).collect();
        let air_times: HashMap<_, _> = match self
            .metadata
            .airing_schedule(media_id, &schedule_episodes)
            .await
        {
            Ok(schedule) => schedule
                .into_iter()
                .map(|a| (a.episode + offset, a.airing_at))
                .collect(),
            Err(e) => {
                tracing::warn!(media_id, error = %e, "failed to fetch airing schedule");
                state.record_failure(self.settings.backoff);
                let retry_in = state.timeout;
                return (state, SeriesOutcome::NotFound { retry_in });
            }
        };

        let nothing_downloaded = state.downloaded.is_empty();
        let mode = plan_mode(target.status, start, nothing_downloaded);
        let endpoint = if target.restricted {
            FeedEndpoint::Restricted
        } else {
            FeedEndpoint::Default
        };
        let plan = TitlePlan::build(target, state.alternative_title.as_deref(), nothing_downloaded);
        let resolver = Resolver {
            feed: &self.feed,
            endpoints: &self.settings.endpoints,
            resolution: self.settings.resolution.as_deref(),
            threshold: self.settings.threshold,
            delay: self.settings.request_delay,
        };

        for (index, title) in plan.iter() {
            if index > 0 {
                tracing::debug!(media_id, title, "trying fallback title");
                tokio::time::sleep(self.settings.request_delay).await;
            }
            let request = ResolveRequest {
                title,
                mode,
                start,
                end,
                missing: &missing,
                endpoint,
                air_times: &air_times,
            };
            let Some(resolution) = resolver.resolve(&request).await else {
                continue;
            };

            let dispatched = self.dispatch(target, resolution).await;
            if dispatched.is_empty() {
                break;
            }
            if index > 0 {
                tracing::info!(media_id, title, "fallback title matched, saving it");
                if let Err(e) = self
                    .db
                    .set_alternative_title(media_id, Some(title.to_string()))
                    .await
                {
                    tracing::warn!(media_id, error = %e, "failed to save alternative title");
                }
                state.alternative_title = Some(title.to_string());
            }
            state.record_success(dispatched.iter().copied());
            return (
                state,
                SeriesOutcome::Downloaded {
                    episodes: dispatched,
                },
            );
        }

        state.record_failure(self.settings.backoff);
        tracing::info!(
            media_id,
            title = %target.title,
            retry_in = state.timeout,
            "nothing found"
        );
        let retry_in = state.timeout;
        (state, SeriesOutcome::NotFound { retry_in })
    }

    /// Send accepted matches to the download client. Returns the episodes
    /// that were actually added.
    async fn dispatch(&self, target: &SeriesTarget, resolution: Resolution) -> Vec<u32> {
        match resolution {
            Resolution::Batch {
                start,
                end,
                candidate,
            } => {
                let episodes: Vec<u32> = (start + 1..=end).collect();
                let label = target.title.clone();
                if self.add(target, &candidate, label, &episodes).await {
                    episodes
                } else {
                    Vec::new()
                }
            }
            Resolution::Episodes(found) => {
                let mut dispatched = Vec::new();
                for (i, (episode, candidate)) in found.into_iter().enumerate() {
                    if i > 0 {
                        tokio::time::sleep(self.settings.request_delay).await;
                    }
                    let label = format!("{} - {episode}", target.title);
                    if self.add(target, &candidate, label, &[episode]).await {
                        dispatched.push(episode);
                    }
                }
                dispatched
            }
        }
    }

    async fn add(
        &self,
        target: &SeriesTarget,
        candidate: &ScoredCandidate,
        label: String,
        episodes: &[u32],
    ) -> bool {
        let media_id = target.media_id;
        let request = DownloadRequest {
            link: candidate.candidate.link.clone(),
            folder: target.title.clone(),
            label: Some(label),
        };
        if let Err(e) = self.downloader.add_torrent(&request).await {
            tracing::warn!(
                media_id,
                source = %candidate.candidate.title,
                error = %e,
                "download client rejected torrent"
            );
            return false;
        }
        tracing::info!(
            media_id,
            source = %candidate.candidate.title,
            seeders = candidate.candidate.seeders,
            episodes = ?episodes,
            "download started"
        );

        if let Err(e) = self
            .db
            .record_downloads(
                media_id,
                episodes.to_vec(),
                candidate.candidate.title.as_str(),
                target.status,
                target.next_airing_episode,
            )
            .await
        {
            tracing::warn!(media_id, error = %e, "failed to persist downloaded episodes");
        }

        let notice = DownloadNotice {
            media_id,
            series_title: target.title.clone(),
            first_episode: episodes.first().copied().unwrap_or_default(),
            last_episode: episodes.last().copied().filter(|_| episodes.len() > 1),
            source_title: candidate.candidate.title.clone(),
            seeders: candidate.candidate.seeders,
            cover_url: target.cover_url.clone(),
        };
        if let Err(e) = self.notifier.notify(&notice).await {
            tracing::warn!(media_id, error = %e, "notification failed");
        }
        true
    }
}

/// Run cycles every `check_every` until `shutdown` resolves.
///
/// Each tick spawns a cycle; a tick that lands while the previous cycle is
/// still running is logged and dropped. With `reset_every` set, the
/// in-memory state is cleared on that cadence, skipping any reset that
/// falls inside a cycle. On shutdown the running cycle is awaited.
pub async fn run_forever<M, F, D, N>(
    scheduler: Arc<Scheduler<M, F, D, N>>,
    check_every: Duration,
    reset_every: Option<Duration>,
    shutdown: impl Future<Output = ()>,
) where
    M: MetadataProvider + 'static,
    F: FeedSource + 'static,
    D: DownloadClient + 'static,
    N: Notifier + 'static,
{
    let mut ticker = tokio::time::interval(check_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut reset = reset_every.map(|every| tokio::time::interval_at(Instant::now() + every, every));
    let mut cycle: Option<JoinHandle<()>> = None;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if cycle.as_ref().is_some_and(|h| !h.is_finished()) {
                    tracing::warn!("previous cycle still running, skipping");
                    continue;
                }
                let scheduler = Arc::clone(&scheduler);
                cycle = Some(tokio::spawn(async move {
                    match scheduler.run_cycle().await {
                        Ok(_) | Err(CycleError::AlreadyRunning) => {}
                        Err(e) => tracing::warn!(error = %e, "cycle skipped"),
                    }
                }));
            }
            _ = async {
                match reset.as_mut() {
                    Some(interval) => {
                        interval.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            } => {
                if scheduler.reset_state().await {
                    tracing::info!("cleared in-memory series state");
                } else {
                    tracing::debug!("cycle running, state reset skipped");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("scheduler stopping");
                break;
            }
        }
    }

    if let Some(handle) = cycle.take() {
        if !handle.is_finished() {
            tracing::info!("waiting for the running cycle");
        }
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "cycle task failed");
        }
    }
}
