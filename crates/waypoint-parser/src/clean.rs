//! Text cleanup applied before any parse attempt
//!
//! The steps run in a fixed order, each one a small pure function:
//!
//! 1. [`strip_fences`] - drop one leading and one trailing code fence
//! 2. [`normalize_quotes`] - smart quotes to ASCII
//! 3. [`collapse_whitespace`] - runs of blanks to a single space
//! 4. [`unescape_single_quotes`] - `\'` to `'`
//! 5. [`escape_bare_backslashes`] - `\x` to `\\x` unless `x` starts a JSON escape

use once_cell::sync::Lazy;
use regex::Regex;

static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("static regex"));

const FENCE: &str = "```";

/// Run every cleanup step in order
#[must_use]
pub fn clean(raw: &str) -> String {
    let text = strip_fences(raw);
    let text = normalize_quotes(text);
    let text = collapse_whitespace(&text);
    let text = unescape_single_quotes(&text);
    escape_bare_backslashes(&text)
}

/// Remove a single leading fence line and a single trailing fence
///
/// The opening fence takes its whole line with it, so a language tag such
/// as `json` disappears too.
#[must_use]
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if text.starts_with(FENCE) {
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => text.trim_start_matches('`'),
        };
    }
    if text.trim_end().ends_with(FENCE) {
        if let Some(close) = text.rfind(FENCE) {
            text = &text[..close];
        }
    }
    text.trim()
}

/// Replace typographic quotes with their ASCII forms
#[must_use]
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{00ab}' | '\u{00bb}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201a}' => '\'',
            other => other,
        })
        .collect()
}

/// Collapse runs of spaces and tabs; newlines and punctuation are kept
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    BLANK_RUN.replace_all(text, " ").trim().to_string()
}

/// Turn `\'`, which JSON rejects, into a plain `'`
#[must_use]
pub fn unescape_single_quotes(text: &str) -> String {
    text.replace("\\'", "'")
}

/// Double every backslash that does not start a JSON escape sequence
///
/// Valid escapes are consumed as a pair so that `\\` followed by a letter
/// stays a literal backslash.
#[must_use]
pub fn escape_bare_backslashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(&next @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u')) => {
                out.push('\\');
                out.push(next);
                chars.next();
            }
            _ => out.push_str("\\\\"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_with_language_tag_are_removed() {
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\n[1]\n```\n"), "[1]");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn only_one_trailing_fence_is_cut() {
        assert_eq!(strip_fences("```\nfoo ``` bar\n```"), "foo ``` bar");
    }

    #[test]
    fn whitespace_runs_collapse_but_newlines_survive() {
        assert_eq!(collapse_whitespace("{\"a\":   1,\n\t\t\"b\": 2}"), "{\"a\": 1,\n \"b\": 2}");
    }

    #[test]
    fn valid_escapes_are_left_alone() {
        let input = r#"line\nbreak \"quoted\" \\ \u00e9 \/"#;
        assert_eq!(escape_bare_backslashes(input), input);
    }

    #[test]
    fn bare_backslashes_are_doubled() {
        assert_eq!(escape_bare_backslashes(r"a\d"), r"a\\d");
        assert_eq!(escape_bare_backslashes(r"end\"), r"end\\");
        assert_eq!(escape_bare_backslashes(r"\\d"), r"\\d");
    }

    #[test]
    fn step_order_handles_combined_noise() {
        let raw = "```json\n{\u{201c}note\u{201d}:   \"it\\'s C:\\go\"}\n```";
        assert_eq!(clean(raw), r#"{"note": "it's C:\\go"}"#);
    }
}
