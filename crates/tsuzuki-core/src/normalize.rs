//! Title normalization for similarity scoring.
//!
//! Release names and metadata titles differ in width, case, quoting and
//! punctuation. Both sides go through the same pipeline before comparison.

use unicode_normalization::UnicodeNormalization;

/// Comparison key for a title: NFKC and lowercase, ASCII stand-ins for a few
/// symbols, punctuation turned into spaces, whitespace collapsed.
pub fn normalize(s: &str) -> String {
    let s = unicode_normalize(s);
    let s = transliterate(&s);
    let s = erase_punctuation(&s);
    collapse_whitespace(&s)
}

fn unicode_normalize(s: &str) -> String {
    s.nfkc().collect::<String>().to_lowercase()
}

/// Symbols release names use in place of letters.
fn transliterate(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '@' => result.push('a'),
            '\u{00D7}' | '\u{2715}' | '\u{2716}' => result.push('x'), // ×, ✕, ✖
            '\u{2019}' | '\u{2018}' | '\u{02BC}' => result.push('\''),
            '\u{00E6}' => result.push_str("ae"),
            '\u{0153}' => result.push_str("oe"),
            '\u{00DF}' => result.push_str("ss"),
            c => result.push(c),
        }
    }
    result
}

/// Drop apostrophes and turn every other non-alphanumeric character into a space.
fn erase_punctuation(s: &str) -> String {
    s.chars()
        .filter(|&c| c != '\'')
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse runs of whitespace in a search query.
pub fn clean_query(s: &str) -> String {
    collapse_whitespace(s.trim())
}
