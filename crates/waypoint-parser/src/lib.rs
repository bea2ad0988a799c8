//! Waypoint response parser
//!
//! Generator output is untrusted text: it arrives wrapped in markdown
//! fences, decorated with smart quotes, padded with prose, or carrying
//! escape sequences JSON does not accept. [`ResponseParser`] runs a fixed
//! cleanup sequence and then extracts the first JSON document it can find.
//!
//! # Example
//!
//! ```rust
//! use waypoint_parser::ResponseParser;
//!
//! let value = ResponseParser::new().parse_value("```json\n{\"a\":1}\n```").unwrap();
//! assert_eq!(value["a"], 1);
//! ```

pub mod clean;
pub mod error;
pub mod extract;

pub use error::ParseError;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Stateless parser for generator output
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    /// Create a parser
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse `raw` into a JSON value
    ///
    /// Cleans the text (see [`clean::clean`]), tries a direct parse and
    /// falls back to the first balanced `{...}` or `[...]` span.
    ///
    /// # Errors
    ///
    /// [`ParseError::Unparseable`] carrying `raw` when nothing parses.
    pub fn parse_value(&self, raw: &str) -> Result<Value, ParseError> {
        let cleaned = clean::clean(raw);
        if cleaned.is_empty() {
            return Err(ParseError::unparseable("empty input", raw));
        }

        match serde_json::from_str::<Value>(&cleaned) {
            Ok(value) => Ok(value),
            Err(direct) => {
                tracing::debug!("direct parse failed ({direct}), scanning for embedded JSON");
                extract::embedded_json(&cleaned).ok_or_else(|| {
                    ParseError::unparseable(format!("no JSON document found: {direct}"), raw)
                })
            }
        }
    }

    /// Parse `raw` and deserialize it into `T`
    ///
    /// # Errors
    ///
    /// [`ParseError::Unparseable`] when no JSON is found, or
    /// [`ParseError::Shape`] when the JSON does not match `T`.
    pub fn parse<T: DeserializeOwned>(&self, raw: &str) -> Result<T, ParseError> {
        let value = self.parse_value(raw)?;
        serde_json::from_value(value).map_err(|e| ParseError::shape(e.to_string(), raw))
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn fenced_json_parses() {
        let value = ResponseParser::new()
            .parse_value("```json\n{\"a\":1}\n```")
            .unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn surrounding_noise_is_ignored() {
        let value = ResponseParser::new()
            .parse_value("noise {\"a\":1} trailing")
            .unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn plain_prose_is_a_parse_error() {
        let err = ResponseParser::new().parse_value("not json at all").unwrap_err();
        assert_eq!(err.raw(), "not json at all");
        assert!(matches!(err, ParseError::Unparseable { .. }));
    }

    #[test]
    fn smart_quotes_are_normalized() {
        let value = ResponseParser::new()
            .parse_value("{\u{201c}title\u{201d}: \u{201c}Engineer\u{201d}}")
            .unwrap();
        assert_eq!(value, json!({"title": "Engineer"}));
    }

    #[test]
    fn bare_backslashes_are_escaped() {
        let value = ResponseParser::new()
            .parse_value(r#"{"path": "C:\data\go"}"#)
            .unwrap();
        assert_eq!(value["path"], r"C:\data\go");
    }

    #[test]
    fn escaped_single_quotes_are_unescaped() {
        let value = ResponseParser::new()
            .parse_value(r#"{"text": "it\'s fine"}"#)
            .unwrap();
        assert_eq!(value["text"], "it's fine");
    }

    #[test]
    fn arrays_are_extracted_from_prose() {
        let value = ResponseParser::new()
            .parse_value("Here are the questions: [{\"q\": 1}, {\"q\": 2}] hope that helps")
            .unwrap();
        assert_eq!(value, json!([{"q": 1}, {"q": 2}]));
    }

    #[test]
    fn typed_parse_reports_shape_errors() {
        #[derive(Debug, Deserialize)]
        struct Paths {
            #[serde(rename = "careerPaths")]
            _career_paths: Vec<String>,
        }

        let err = ResponseParser::new().parse::<Paths>("{\"other\": 1}").unwrap_err();
        assert!(matches!(err, ParseError::Shape { .. }));
    }
}
