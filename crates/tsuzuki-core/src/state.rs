//! In-memory per-series state: downloaded episodes and lookup backoff.

use std::collections::{BTreeSet, HashMap};

use crate::episodes::is_up_to_date;
use crate::models::SeriesTarget;
use crate::storage::SeriesRecord;

/// How failed lookups push back the next attempt, counted in cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub step: u32,
    /// Once the ceiling reaches this value it wraps back to zero.
    pub ceiling: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            step: 2,
            ceiling: 50,
        }
    }
}

/// State for one tracked series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesState {
    pub downloaded: BTreeSet<u32>,
    /// Cycles to skip before the next lookup.
    pub timeout: u32,
    /// Current backoff ceiling.
    pub max_timeout: u32,
    pub starting_offset: u32,
    pub alternative_title: Option<String>,
    /// Whether persisted state has been merged in yet.
    pub seeded: bool,
}

impl SeriesState {
    /// Advance one cycle. Returns `true` if the series may be looked up now.
    pub fn tick(&mut self) -> bool {
        if self.timeout > 0 {
            self.timeout -= 1;
            false
        } else {
            true
        }
    }

    /// Whether a lookup could find anything new for `target`.
    ///
    /// Unseeded state is always due.
    pub fn is_due(&self, target: &SeriesTarget) -> bool {
        if !self.seeded {
            return true;
        }
        let start = target.progress + self.starting_offset;
        let end = target.latest_episode() + self.starting_offset;
        !is_up_to_date(start, end, &self.downloaded)
    }

    /// Merge the persisted record. The downloaded set only grows.
    pub fn sync(&mut self, record: &SeriesRecord) {
        self.downloaded.extend(record.downloaded.iter().copied());
        self.starting_offset = record.starting_episode;
        self.alternative_title = record.alternative_title.clone();
        self.seeded = true;
    }

    pub fn record_success(&mut self, episodes: impl IntoIterator<Item = u32>) {
        self.downloaded.extend(episodes);
        self.timeout = 0;
        self.max_timeout = 0;
    }

    pub fn record_failure(&mut self, policy: BackoffPolicy) {
        if self.max_timeout >= policy.ceiling {
            self.max_timeout = 0;
        }
        self.max_timeout += policy.step;
        self.timeout = self.max_timeout;
    }
}

/// All tracked series, keyed by media id.
#[derive(Debug, Default)]
pub struct SeriesStore {
    series: HashMap<u64, SeriesState>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a state out for processing. Unseen series start fresh.
    pub fn take(&mut self, media_id: u64) -> SeriesState {
        self.series.remove(&media_id).unwrap_or_default()
    }

    pub fn put(&mut self, media_id: u64, state: SeriesState) {
        self.series.insert(media_id, state);
    }

    pub fn get(&self, media_id: u64) -> Option<&SeriesState> {
        self.series.get(&media_id)
    }

    /// Forget one series; it is looked up on the next cycle.
    pub fn reset(&mut self, media_id: u64) {
        self.series.remove(&media_id);
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
