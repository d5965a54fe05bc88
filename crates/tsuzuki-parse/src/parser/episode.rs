use regex::Regex;
use std::sync::LazyLock;

use crate::elements::EpisodeRange;

/// Result of a successful episode extraction.
#[derive(Debug)]
pub struct EpisodeMatch {
    /// Raw episode string (e.g., "05", "12v2").
    pub raw: String,
    /// Parsed episode number. `None` for a half episode such as "07.5",
    /// which is a recap and not episode 7.
    pub number: Option<u32>,
}

const MAX_EPISODE: u32 = 1999;

static RE_COMBINED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^S(\d{1,2})E(\d{1,4})(?:v\d)?$").unwrap());

static RE_KEYWORD_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:EP\.?|E|EPISODE|#)(\d{1,4})(?:v\d)?$").unwrap());

static RE_VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,4})[vV]\d$").unwrap());

static RE_FRACTIONAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,4})\.5$").unwrap());

static RE_JAPANESE_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^第(\d{1,4})[話集]$").unwrap());

static RE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:EPS?\.?\s*|EPISODES?\s+)?(\d{1,4})\s*[-~]\s*(\d{1,4})$").unwrap()
});

/// Try the single-episode strategies in order of specificity.
pub fn try_extract(text: &str) -> Option<EpisodeMatch> {
    let text = text.trim();
    if text.is_empty() || is_year_like(text) {
        return None;
    }
    if RE_FRACTIONAL.is_match(text) {
        return Some(EpisodeMatch {
            raw: text.to_string(),
            number: None,
        });
    }

    let number = [
        &*RE_COMBINED,
        &*RE_KEYWORD_PREFIX,
        &*RE_VERSION_SUFFIX,
        &*RE_JAPANESE_COUNTER,
    ]
    .iter()
    .find_map(|re| {
        let caps = re.captures(text)?;
        // The episode is always the last capture group.
        caps.iter().flatten().last()?.as_str().parse::<u32>().ok()
    })
    .or_else(|| text.parse::<u32>().ok())?;

    if number > MAX_EPISODE {
        return None;
    }
    Some(EpisodeMatch {
        raw: text.to_string(),
        number: Some(number),
    })
}

/// Parse an explicit range like `01-12`, `01 ~ 12` or `EP 1-24`.
pub fn try_range(text: &str) -> Option<EpisodeRange> {
    let caps = RE_RANGE.captures(text.trim())?;
    range_from_parts(&caps[1], &caps[2])
}

/// Build a range from two numeric strings, rejecting years and inverted bounds.
pub fn range_from_parts(first: &str, last: &str) -> Option<EpisodeRange> {
    if is_year_like(first) || is_year_like(last) {
        return None;
    }
    let first: u32 = first.parse().ok()?;
    let last: u32 = last.parse().ok()?;
    if first >= last || last > MAX_EPISODE {
        return None;
    }
    Some(EpisodeRange { first, last })
}

/// Check if a 4-digit number looks like a year (1950-2050).
fn is_year_like(s: &str) -> bool {
    s.len() == 4 && s.parse::<u32>().is_ok_and(|n| (1950..=2050).contains(&n))
}
