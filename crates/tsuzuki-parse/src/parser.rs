mod episode;

use crate::elements::Elements;
use crate::keyword::{self, KeywordKind};
use crate::tokenizer::{self, Token, TokenKind};

/// Parse a release name into its component elements.
///
/// # Example
/// ```
/// let result = tsuzuki_parse::parse("[SubsPlease] Sousou no Frieren - 05 (1080p) [ABCD1234].mkv");
/// assert_eq!(result.title.as_deref(), Some("Sousou no Frieren"));
/// assert_eq!(result.episode_number, Some(5));
/// assert_eq!(result.release_group.as_deref(), Some("SubsPlease"));
/// assert_eq!(result.resolution.as_deref(), Some("1080p"));
/// ```
pub fn parse(release_name: &str) -> Elements {
    let (tokens, _extension) = tokenizer::tokenize(release_name);
    let mut elements = Elements::default();
    let mut identified = vec![false; tokens.len()];

    identify_bracketed(&tokens, &mut elements, &mut identified);
    extract_release_group(&tokens, &mut elements, &mut identified);
    extract_checksum(&tokens, &mut elements, &mut identified);
    identify_technical_terms(&tokens, &mut elements, &mut identified);
    extract_free_range(&tokens, &mut elements, &mut identified);
    if elements.episode_range.is_none() {
        extract_episode(&tokens, &mut elements, &mut identified);
    }
    identify_trailing_keywords(&tokens, &mut elements, &mut identified);
    extract_title(&tokens, &mut elements, &mut identified);

    elements
}

/// Pass 1: keywords, resolutions and ranges inside brackets.
///
/// Multi-word brackets such as `[BD 1080p HEVC]` are checked word by word;
/// the bracket counts as metadata once any word is recognised.
fn identify_bracketed(tokens: &[Token], elements: &mut Elements, identified: &mut [bool]) {
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Bracketed {
            continue;
        }
        if let Some(range) = episode::try_range(&token.text) {
            elements.episode_range.get_or_insert(range);
            identified[i] = true;
            continue;
        }
        if identify_words(&token.text, elements) {
            identified[i] = true;
        }
    }
}

/// Apply every keyword or resolution found in `text`. Returns true if any matched.
fn identify_words(text: &str, elements: &mut Elements) -> bool {
    if let Some(kind) = keyword::lookup(text) {
        apply_keyword(kind, text, elements);
        return true;
    }
    let mut matched = false;
    for word in text.split(|c: char| c.is_whitespace() || c == ',' || c == '_') {
        if word.is_empty() {
            continue;
        }
        if let Some(kind) = keyword::lookup(word) {
            apply_keyword(kind, word, elements);
            matched = true;
        } else if let Some(res) = parse_resolution(word) {
            elements.resolution.get_or_insert(res);
            matched = true;
        }
    }
    matched
}

/// Pass 2: First bracketed token (before free text begins) is likely the release group.
fn extract_release_group(tokens: &[Token], elements: &mut Elements, identified: &mut [bool]) {
    for (i, token) in tokens.iter().enumerate() {
        if identified[i] {
            continue;
        }
        match token.kind {
            TokenKind::Bracketed if !is_checksum(&token.text) => {
                elements.release_group = Some(token.text.clone());
                identified[i] = true;
                return;
            }
            TokenKind::FreeText => return,
            _ => {}
        }
    }
}

/// Pass 3: 8-character hex string in brackets is a CRC32 checksum.
fn extract_checksum(tokens: &[Token], elements: &mut Elements, identified: &mut [bool]) {
    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Bracketed && !identified[i] && is_checksum(&token.text) {
            elements.checksum = Some(token.text.clone());
            identified[i] = true;
            return;
        }
    }
}

fn is_checksum(s: &str) -> bool {
    s.len() == 8 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Pass 4: resolutions and codec terms in free text.
///
/// Words like "English" or "WEB" can be part of a title and are left for
/// [`identify_trailing_keywords`].
fn identify_technical_terms(tokens: &[Token], elements: &mut Elements, identified: &mut [bool]) {
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::FreeText || identified[i] {
            continue;
        }
        if let Some(kind) = keyword::lookup(&token.text).filter(|k| k.is_technical()) {
            apply_keyword(kind, &token.text, elements);
            identified[i] = true;
        } else if let Some(res) = parse_resolution(&token.text) {
            elements.resolution.get_or_insert(res);
            identified[i] = true;
        }
    }
}

/// Pass 5: ranges written in free text: `01-12`, `01~12`, `01 ~ 12`.
///
/// A spaced dash (`2 - 05`) is not a range; it is the usual title/episode
/// separator.
fn extract_free_range(tokens: &[Token], elements: &mut Elements, identified: &mut [bool]) {
    if elements.episode_range.is_some() {
        return;
    }
    for i in 0..tokens.len() {
        if identified[i] || tokens[i].kind != TokenKind::FreeText {
            continue;
        }
        if let Some(range) = episode::try_range(&tokens[i].text) {
            elements.episode_range = Some(range);
            identified[i] = true;
            return;
        }

        let span = match tokens.get(i + 1..i + 3) {
            Some([sep, last]) if sep.text == "-" => Some((i + 1, last, i + 2)),
            _ => match tokens.get(i + 1..i + 5) {
                Some([d1, sep, d2, last])
                    if d1.kind == TokenKind::Delimiter
                        && sep.text == "~"
                        && d2.kind == TokenKind::Delimiter =>
                {
                    Some((i + 2, last, i + 4))
                }
                _ => None,
            },
        };
        let Some((sep_idx, last, last_idx)) = span else {
            continue;
        };
        if last.kind != TokenKind::FreeText {
            continue;
        }
        if let Some(range) = episode::range_from_parts(&tokens[i].text, &last.text) {
            elements.episode_range = Some(range);
            for idx in [i, sep_idx, last_idx] {
                identified[idx] = true;
            }
            return;
        }
    }
}

/// Pass 6: Find episode number patterns in unidentified tokens.
fn extract_episode(tokens: &[Token], elements: &mut Elements, identified: &mut [bool]) {
    // Strategy 1: " - XX" (dash followed by a number).
    for i in 0..tokens.len() {
        if identified[i] || !is_dash(&tokens[i]) {
            continue;
        }
        if let Some(next) = next_free_text(tokens, identified, i) {
            if let Some(m) = episode::try_extract(&tokens[next].text) {
                identified[i] = true;
                set_episode(elements, m);
                identified[next] = true;
                return;
            }
        }
    }

    // Strategy 2: standalone number tokens after some title text.
    let mut saw_text = false;
    for i in 0..tokens.len() {
        if identified[i] || tokens[i].kind != TokenKind::FreeText {
            continue;
        }
        match episode::try_extract(&tokens[i].text) {
            Some(m) if saw_text => {
                set_episode(elements, m);
                identified[i] = true;
                return;
            }
            Some(_) => {}
            None => saw_text = true,
        }
    }

    // Strategy 3: bracketed episode numbers like "[01]" or "(12v2)".
    for i in 0..tokens.len() {
        if identified[i] || tokens[i].kind != TokenKind::Bracketed {
            continue;
        }
        if let Some(m) = episode::try_extract(&tokens[i].text) {
            set_episode(elements, m);
            identified[i] = true;
            return;
        }
    }
}

fn set_episode(elements: &mut Elements, m: episode::EpisodeMatch) {
    elements.episode = Some(m.raw);
    elements.episode_number = m.number;
}

/// Pass 7: every keyword after the title.
///
/// Inside the title run only a last ` - ` segment made up entirely of
/// keywords counts, as in `"Made in Abyss - Batch"`.
fn identify_trailing_keywords(tokens: &[Token], elements: &mut Elements, identified: &mut [bool]) {
    let (start, end) = title_run(tokens, identified).unwrap_or((tokens.len(), tokens.len()));

    for i in end..tokens.len() {
        if identified[i] || tokens[i].kind != TokenKind::FreeText {
            continue;
        }
        if let Some(kind) = keyword::lookup(&tokens[i].text) {
            apply_keyword(kind, &tokens[i].text, elements);
            identified[i] = true;
        }
    }

    let Some(dash) = (start..end).rev().find(|&i| is_dash(&tokens[i])) else {
        return;
    };
    let words: Vec<usize> = (dash + 1..end)
        .filter(|&i| tokens[i].kind == TokenKind::FreeText)
        .collect();
    if words.is_empty() || !words.iter().all(|&i| keyword::lookup(&tokens[i].text).is_some()) {
        return;
    }
    identified[dash] = true;
    for i in words {
        if let Some(kind) = keyword::lookup(&tokens[i].text) {
            apply_keyword(kind, &tokens[i].text, elements);
        }
        identified[i] = true;
    }
}

/// Pass 8: the first run of unidentified free text forms the title.
///
/// Dashes inside the run stay (`"86 - Eighty Six"`). A parenthesised name
/// right after the title is an alternate title and is appended as
/// `"Title (Alternate)"`.
fn extract_title(tokens: &[Token], elements: &mut Elements, identified: &mut [bool]) {
    let Some((start, end)) = title_run(tokens, identified) else {
        return;
    };

    let mut title = String::new();
    for token in &tokens[start..end] {
        match token.kind {
            // The tokenizer swallows the delimiter after a dash.
            TokenKind::FreeText if is_dash(token) => title.push_str(" - "),
            TokenKind::FreeText => title.push_str(&token.text),
            TokenKind::Delimiter => title.push(' '),
            TokenKind::Bracketed => {}
        }
    }
    let title = title
        .trim_end_matches(|c: char| c == '-' || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        return;
    }

    let alternate = (end..tokens.len())
        .find(|&i| tokens[i].kind != TokenKind::Delimiter)
        .filter(|&i| {
            !identified[i]
                && tokens[i].is_parenthesized()
                && tokens[i].text.chars().any(char::is_alphabetic)
        });
    let title = match alternate {
        Some(i) => {
            identified[i] = true;
            format!("{title} ({})", tokens[i].text)
        }
        None => title,
    };

    elements.title = Some(title);
}

/// Token span `[start, end)` of the title: from the first unidentified word
/// up to the next identified or bracketed token.
fn title_run(tokens: &[Token], identified: &[bool]) -> Option<(usize, usize)> {
    let start = (0..tokens.len()).find(|&i| {
        !identified[i] && tokens[i].kind == TokenKind::FreeText && !is_dash(&tokens[i])
    })?;
    let end = (start..tokens.len())
        .find(|&i| identified[i] || tokens[i].kind == TokenKind::Bracketed)
        .unwrap_or(tokens.len());
    Some((start, end))
}

fn is_dash(token: &Token) -> bool {
    token.kind == TokenKind::FreeText && token.text == "-"
}

/// Find the next unidentified free text token after index `start`.
fn next_free_text(tokens: &[Token], identified: &[bool], start: usize) -> Option<usize> {
    for i in (start + 1)..tokens.len() {
        if identified[i] {
            continue;
        }
        match tokens[i].kind {
            TokenKind::FreeText => return Some(i),
            TokenKind::Bracketed => return None,
            TokenKind::Delimiter => {}
        }
    }
    None
}

/// Try to parse a resolution string.
/// Handles: "1920x1080", "1080p", "720p", etc.
fn parse_resolution(s: &str) -> Option<String> {
    let lower = s.to_lowercase();

    if let Some((width, height)) = lower.split_once('x') {
        if width.parse::<u32>().is_ok() && height.parse::<u32>().is_ok() {
            return Some(format!("{height}p"));
        }
    }

    if let Some(num_part) = lower.strip_suffix('p').or_else(|| lower.strip_suffix('i')) {
        if num_part.len() >= 3 && num_part.parse::<u32>().is_ok() {
            return Some(lower);
        }
    }

    None
}

/// Apply a keyword match to the appropriate element field.
fn apply_keyword(kind: KeywordKind, text: &str, elements: &mut Elements) {
    match kind {
        KeywordKind::VideoCodec => {
            elements.video_codec.get_or_insert_with(|| text.to_string());
        }
        KeywordKind::AudioCodec => {
            elements.audio_codec.get_or_insert_with(|| text.to_string());
        }
        KeywordKind::Resolution => {
            elements.resolution.get_or_insert_with(|| text.to_lowercase());
        }
        KeywordKind::Source => {
            elements.source.get_or_insert_with(|| text.to_string());
        }
        KeywordKind::Release(flags) => elements.release |= flags,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{EpisodeRange, ReleaseFlags};

    #[test]
    fn test_typical_subgroup_format() {
        let r = parse("[SubsPlease] Sousou no Frieren - 05 (1080p) [ABCD1234].mkv");
        assert_eq!(r.title.as_deref(), Some("Sousou no Frieren"));
        assert_eq!(r.episode_number, Some(5));
        assert_eq!(r.release_group.as_deref(), Some("SubsPlease"));
        assert_eq!(r.resolution.as_deref(), Some("1080p"));
        assert_eq!(r.checksum.as_deref(), Some("ABCD1234"));
        assert!(r.episode_range.is_none());
    }

    #[test]
    fn test_no_group() {
        let r = parse("Show Name - 07 [1080p]");
        assert_eq!(r.title.as_deref(), Some("Show Name"));
        assert_eq!(r.episode_number, Some(7));
        assert_eq!(r.resolution.as_deref(), Some("1080p"));
        assert!(r.release_group.is_none());
    }

    #[test]
    fn test_underscore_format() {
        let r = parse("[HorribleSubs]_Naruto_Shippuuden_-_500_[720p].mkv");
        assert_eq!(r.title.as_deref(), Some("Naruto Shippuuden"));
        assert_eq!(r.episode_number, Some(500));
    }

    #[test]
    fn test_version_suffix() {
        let r = parse("[Group] Title - 05v2 [720p].mkv");
        assert_eq!(r.episode_number, Some(5));
        assert_eq!(r.episode.as_deref(), Some("05v2"));
    }

    #[test]
    fn test_number_in_title_is_not_a_range() {
        let r = parse("[Group] Mob Psycho 100 - 05 [1080p]");
        assert_eq!(r.title.as_deref(), Some("Mob Psycho 100"));
        assert_eq!(r.episode_number, Some(5));
        assert!(r.episode_range.is_none());
    }

    #[test]
    fn test_bracketed_batch_range() {
        let r = parse("[Judas] Kimetsu no Yaiba (01-26) [BD 1080p HEVC] [Batch]");
        assert_eq!(r.title.as_deref(), Some("Kimetsu no Yaiba"));
        assert_eq!(r.episode_range, Some(EpisodeRange { first: 1, last: 26 }));
        assert_eq!(r.resolution.as_deref(), Some("1080p"));
        assert_eq!(r.source.as_deref(), Some("BD"));
        assert!(r.is_batch());
        assert!(r.episode_number.is_none());
    }

    #[test]
    fn test_free_text_range() {
        let r = parse("[Group] Spy x Family - 01-12 [1080p]");
        assert_eq!(r.title.as_deref(), Some("Spy x Family"));
        assert_eq!(r.episode_range, Some(EpisodeRange { first: 1, last: 12 }));
    }

    #[test]
    fn test_tilde_range() {
        let r = parse("Bocchi the Rock! 01 ~ 12 [1080p] (Complete)");
        assert_eq!(r.title.as_deref(), Some("Bocchi the Rock!"));
        assert_eq!(r.episode_range, Some(EpisodeRange { first: 1, last: 12 }));
        assert!(r.release.contains(ReleaseFlags::COMPLETE));
    }

    #[test]
    fn test_batch_without_range() {
        let r = parse("[Group] Made in Abyss [1080p] [Batch]");
        assert_eq!(r.title.as_deref(), Some("Made in Abyss"));
        assert!(r.is_batch());
        assert!(r.episode_range.is_none());
    }

    #[test]
    fn test_parenthesized_alternate_title() {
        let r = parse("[Group] Sousou no Frieren (Frieren Beyond Journey's End) - 05 [1080p]");
        assert_eq!(
            r.title.as_deref(),
            Some("Sousou no Frieren (Frieren Beyond Journey's End)")
        );
        assert_eq!(r.episode_number, Some(5));
    }

    #[test]
    fn test_bar_separated_title_is_kept_whole() {
        let r = parse("[Group] Kaijuu 8-gou | Kaiju No. 8 - 03 [720p]");
        assert_eq!(r.title.as_deref(), Some("Kaijuu 8-gou | Kaiju No 8"));
        assert_eq!(r.episode_number, Some(3));
    }

    #[test]
    fn test_keyword_inside_title_is_kept() {
        let r = parse("[G] Show English - 01 [1080p]");
        assert_eq!(r.title.as_deref(), Some("Show English"));
        assert_eq!(r.episode_number, Some(1));

        let r = parse("[G] Web Complete Raw Show - 02 [720p]");
        assert_eq!(r.title.as_deref(), Some("Web Complete Raw Show"));
        assert!(!r.is_batch());
        assert!(r.source.is_none());
    }

    #[test]
    fn test_dashes_inside_title() {
        let r = parse("[Erai-raws] Shingeki no Kyojin - The Final Season - 05 [1080p]");
        assert_eq!(r.release_group.as_deref(), Some("Erai-raws"));
        assert_eq!(
            r.title.as_deref(),
            Some("Shingeki no Kyojin - The Final Season")
        );
        assert_eq!(r.episode_number, Some(5));

        let r = parse("[SubsPlease] 86 - Eighty Six - 05 (1080p)");
        assert_eq!(r.title.as_deref(), Some("86 - Eighty Six"));
        assert_eq!(r.episode_number, Some(5));
        assert_eq!(r.resolution.as_deref(), Some("1080p"));
    }

    #[test]
    fn test_keywords_after_title() {
        let r = parse("[G] Made in Abyss - Batch [1080p]");
        assert_eq!(r.title.as_deref(), Some("Made in Abyss"));
        assert!(r.is_batch());

        let r = parse("Show Name 1080p WEB x264");
        assert_eq!(r.title.as_deref(), Some("Show Name"));
        assert_eq!(r.resolution.as_deref(), Some("1080p"));
        assert_eq!(r.source.as_deref(), Some("WEB"));
        assert_eq!(r.video_codec.as_deref(), Some("x264"));
    }

    #[test]
    fn test_half_episode_has_no_number() {
        let r = parse("[G] Show Name - 07.5 [1080p]");
        assert_eq!(r.title.as_deref(), Some("Show Name"));
        assert_eq!(r.episode.as_deref(), Some("07.5"));
        assert_eq!(r.episode_number, None);
    }

    #[test]
    fn test_resolution_wxh() {
        let r = parse("[Group] Title - 01 (1920x1080 x264).mkv");
        assert_eq!(r.resolution.as_deref(), Some("1080p"));
        assert_eq!(r.video_codec.as_deref(), Some("x264"));
    }

    #[test]
    fn test_missing_resolution() {
        let r = parse("Title - 03");
        assert_eq!(r.title.as_deref(), Some("Title"));
        assert!(r.resolution.is_none());
    }

    #[test]
    fn test_serializes() {
        let r = parse("[Group] Title - 01 [1080p] [Batch]");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["episode_number"], 1);
        assert_eq!(json["resolution"], "1080p");
    }
}
