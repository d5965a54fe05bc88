//! Candidate scoring.
//!
//! Each candidate gets four signals: title similarity in [0,1] plus three
//! boolean checks worth one point each. The total is capped at 4.

use chrono::{DateTime, Utc};
use tsuzuki_parse::Elements;

use crate::models::Candidate;
use crate::normalize::normalize;

/// Per-signal breakdown of a candidate's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreVector {
    pub title: f64,
    pub resolution: bool,
    pub episode: bool,
    pub air_date: bool,
}

impl ScoreVector {
    pub const MAX: f64 = 4.0;

    pub fn total(&self) -> f64 {
        let points = [self.resolution, self.episode, self.air_date]
            .into_iter()
            .filter(|b| *b)
            .count() as f64;
        (self.title + points).min(Self::MAX)
    }

    pub fn is_perfect(&self) -> bool {
        self.total() >= Self::MAX
    }
}

/// The episode or range a search is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeTarget {
    Single(u32),
    /// Episodes `(start, end]`.
    Range { start: u32, end: u32 },
}

#[derive(Debug, Clone)]
pub struct MatchRequest<'a> {
    pub title: &'a str,
    /// `None` disables the resolution check.
    pub resolution: Option<&'a str>,
    pub target: EpisodeTarget,
    /// Air time of the episode, or of the last episode of a range.
    /// Unknown air times count as plausible.
    pub aired_at: Option<DateTime<Utc>>,
}

/// A candidate with its parse and score.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub elements: Elements,
    pub score: ScoreVector,
}

/// Title forms to compare against the search title.
///
/// `"A (B)"` also yields `"A"` and `"B"`. `"A | B"` also yields each side.
pub fn title_variants(parsed_title: &str) -> Vec<String> {
    let mut variants = vec![parsed_title.trim().to_string()];

    if let (Some(open), true) = (parsed_title.find('('), parsed_title.trim_end().ends_with(')')) {
        let stripped = parsed_title[..open].trim();
        let inner = parsed_title[open + 1..]
            .trim_end()
            .trim_end_matches(')')
            .trim();
        variants.extend([stripped, inner].into_iter().map(str::to_string));
    }

    if parsed_title.contains('|') {
        variants.extend(parsed_title.split('|').map(|s| s.trim().to_string()));
    }

    variants.retain(|v| !v.is_empty());
    variants.dedup();
    variants
}

/// Best Sørensen–Dice similarity between the search title and any variant.
pub fn title_similarity(search_title: &str, parsed_title: &str) -> f64 {
    let search = normalize(search_title);
    title_variants(parsed_title)
        .iter()
        .map(|v| strsim::sorensen_dice(&search, &normalize(v)))
        .fold(0.0, f64::max)
}

/// Score one parsed candidate. `None` means malformed: no title, or no
/// resolution where one is required.
pub fn score_candidate(
    request: &MatchRequest<'_>,
    candidate: &Candidate,
    elements: &Elements,
) -> Option<ScoreVector> {
    let parsed_title = elements.title.as_deref()?;

    let resolution = match request.resolution {
        None => true,
        Some(wanted) => {
            let found = elements.resolution.as_deref()?;
            found.to_lowercase().contains(&wanted.to_lowercase())
        }
    };

    let episode = match request.target {
        EpisodeTarget::Single(ep) => elements.episode_number == Some(ep),
        EpisodeTarget::Range { start, end } => match elements.episode_range {
            Some(range) => range.first == start + 1 && range.last == end,
            None => elements.is_batch() || end.saturating_sub(start) == 1,
        },
    };

    let air_date = match (request.aired_at, candidate.pub_date) {
        (None, _) => true,
        (Some(aired), Some(published)) => published > aired,
        (Some(_), None) => false,
    };

    Some(ScoreVector {
        title: title_similarity(request.title, parsed_title),
        resolution,
        episode,
        air_date,
    })
}

/// Pick the best candidate at or above `threshold`.
///
/// Candidates are expected in seeder order; ties keep the earlier one.
/// A perfect score stops the scan.
pub fn select_best(
    request: &MatchRequest<'_>,
    candidates: Vec<Candidate>,
    threshold: f64,
) -> Option<ScoredCandidate> {
    let mut best: Option<ScoredCandidate> = None;

    for candidate in candidates {
        if candidate.seeders == 0 {
            continue;
        }
        let elements = tsuzuki_parse::parse(&candidate.title);
        let Some(score) = score_candidate(request, &candidate, &elements) else {
            tracing::trace!(title = %candidate.title, "candidate skipped");
            continue;
        };

        if best.as_ref().is_some_and(|b| score.total() <= b.score.total()) {
            continue;
        }
        let perfect = score.is_perfect();
        best = Some(ScoredCandidate {
            candidate,
            elements,
            score,
        });
        if perfect {
            break;
        }
    }

    let best = best?;
    tracing::debug!(
        title = %best.candidate.title,
        score = best.score.total(),
        threshold,
        "best candidate"
    );
    (best.score.total() >= threshold).then_some(best)
}
