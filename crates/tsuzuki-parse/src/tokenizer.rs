/// Token types produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Text enclosed in brackets: `[SubGroup]`, `(720p)`.
    Bracketed,
    /// Free text between brackets/delimiters.
    FreeText,
    /// A delimiter character (space, underscore, dot).
    Delimiter,
}

/// A single token from a release name.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// The opening bracket character for `Bracketed` tokens.
    pub bracket: Option<char>,
}

impl Token {
    fn free(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::FreeText,
            text: text.into(),
            bracket: None,
        }
    }

    /// Whether this token was written in round brackets.
    pub fn is_parenthesized(&self) -> bool {
        matches!(self.bracket, Some('(') | Some('\u{FF08}'))
    }
}

/// Opening/closing bracket pairs, including CJK brackets.
const BRACKETS: &[(char, char)] = &[
    ('[', ']'),
    ('(', ')'),
    ('{', '}'),
    ('\u{FF08}', '\u{FF09}'), // （）
    ('\u{300C}', '\u{300D}'), // 「」
    ('\u{300E}', '\u{300F}'), // 『』
    ('\u{3010}', '\u{3011}'), // 【】
];

/// Characters that separate tokens (excluding dash, which gets special treatment).
fn is_soft_delimiter(c: char) -> bool {
    matches!(c, ' ' | '_' | '.' | '\u{3000}')
}

/// Dash-family characters that act as token separators but are preserved as FreeText.
fn is_dash(c: char) -> bool {
    matches!(c, '-' | '\u{2013}' | '\u{2014}')
}

fn closing_bracket(c: char) -> Option<char> {
    BRACKETS
        .iter()
        .find(|(open, _)| *open == c)
        .map(|(_, close)| *close)
}

/// Tokenize a release name into structured tokens.
///
/// Returns (tokens, file_extension).
///
/// - Bracket-enclosed groups `[...]`, `(...)`, `{...}` and CJK brackets become
///   one `Bracketed` token each (the opening character is remembered).
/// - Dashes (`-`, `–`, `—`) are emitted as `FreeText("-")` tokens; a dash
///   inside a word (`Re-Zero`, `Dual-Audio`) stays part of the word.
/// - Runs of spaces, underscores and dots collapse into one `Delimiter`.
pub fn tokenize(input: &str) -> (Vec<Token>, Option<String>) {
    let (input, extension) = strip_extension(input.trim());
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(close) = closing_bracket(c) {
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != close {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect::<String>().trim().to_string();
            if !text.is_empty() {
                tokens.push(Token {
                    kind: TokenKind::Bracketed,
                    text,
                    bracket: Some(c),
                });
            }
            if i < chars.len() {
                i += 1;
            }
            continue;
        }

        if is_dash(c) {
            tokens.push(Token::free("-"));
            i += 1;
            while i < chars.len() && is_soft_delimiter(chars[i]) {
                i += 1;
            }
            continue;
        }

        if is_soft_delimiter(c) {
            while i < chars.len() && is_soft_delimiter(chars[i]) {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Delimiter,
                text: String::from(" "),
                bracket: None,
            });
            continue;
        }

        // Free text until a delimiter, bracket or standalone dash.
        let start = i;
        while i < chars.len() && closing_bracket(chars[i]).is_none() {
            let ch = chars[i];
            if is_soft_delimiter(ch) {
                // "07.5", "5.1"
                if ch == '.'
                    && i > start
                    && i + 1 < chars.len()
                    && chars[i - 1].is_ascii_digit()
                    && chars[i + 1].is_ascii_digit()
                {
                    i += 1;
                    continue;
                }
                break;
            }
            if is_dash(ch) && !is_word_dash(&chars, start, i) {
                break;
            }
            i += 1;
        }
        let text: String = chars[start..i].iter().collect();
        if !text.is_empty() {
            tokens.push(Token::free(text));
        }
    }

    (tokens, extension.map(|s| s.to_string()))
}

/// A dash inside a word, as in `Re-Zero` or `8-gou`.
/// A digit after the dash splits, so `01-12` stays three tokens.
fn is_word_dash(chars: &[char], word_start: usize, pos: usize) -> bool {
    pos > word_start
        && pos + 1 < chars.len()
        && chars[pos - 1].is_alphanumeric()
        && chars[pos + 1].is_alphabetic()
}

/// Strip common video file extensions, returning the base name and extracted extension.
fn strip_extension(input: &str) -> (&str, Option<&str>) {
    for ext in &[".mkv", ".mp4", ".avi", ".webm", ".m4v", ".ts", ".m2ts"] {
        let split_pos = input.len().wrapping_sub(ext.len());
        if split_pos < input.len() && input.is_char_boundary(split_pos) {
            let suffix = &input[split_pos..];
            if suffix.eq_ignore_ascii_case(ext) {
                return (&input[..split_pos], Some(&ext[1..]));
            }
        }
    }
    (input, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokenization() {
        let (tokens, ext) = tokenize("[SubGroup] Anime Title - 05 [1080p].mkv");
        assert_eq!(ext.as_deref(), Some("mkv"));
        assert_eq!(tokens[0].kind, TokenKind::Bracketed);
        assert_eq!(tokens[0].text, "SubGroup");
        assert_eq!(tokens[0].bracket, Some('['));
        assert_eq!(tokens[1].kind, TokenKind::Delimiter);
        assert_eq!(tokens[2].kind, TokenKind::FreeText);
        assert_eq!(tokens[2].text, "Anime");
    }

    #[test]
    fn test_underscore_delimiters() {
        let (tokens, _) = tokenize("[Group]_Anime_Title_-_05_[720p]");
        let free: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::FreeText && t.text != "-")
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(free, vec!["Anime", "Title", "05"]);
    }

    #[test]
    fn test_extension_stripping() {
        assert_eq!(strip_extension("test.MKV"), ("test", Some("mkv")));
        assert_eq!(strip_extension("test.txt"), ("test.txt", None));
    }

    #[test]
    fn test_numeric_range_splits_on_dash() {
        let (tokens, _) = tokenize("Title 01-12");
        let texts: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::FreeText)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, vec!["Title", "01", "-", "12"]);
    }

    #[test]
    fn test_word_dash_is_kept() {
        let (tokens, _) = tokenize("[Dual-Audio] Re-Zero - 03");
        assert_eq!(tokens[0].text, "Dual-Audio");
        assert!(tokens.iter().any(|t| t.text == "Re-Zero"));
    }

    #[test]
    fn test_parenthesized_bracket() {
        let (tokens, _) = tokenize("Title (Alt Name) [1080p]");
        let paren = tokens.iter().find(|t| t.text == "Alt Name").unwrap();
        assert!(paren.is_parenthesized());
        let square = tokens.iter().find(|t| t.text == "1080p").unwrap();
        assert!(!square.is_parenthesized());
    }

    #[test]
    fn test_en_dash() {
        let (tokens, _) = tokenize("Title \u{2013} 05");
        assert!(tokens.iter().any(|t| t.text == "-"));
    }
}
