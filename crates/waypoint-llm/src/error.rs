//! Generation errors

use waypoint_parser::ParseError;

/// Failure of a generation call
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Backend answered with nothing but whitespace
    #[error("empty response from backend {backend}")]
    EmptyResponse {
        /// Backend id
        backend: String,
    },

    /// Backend rejected or failed the request
    #[error("backend request failed: {0}")]
    Backend(String),

    /// Transport failure
    #[error("network error: {0}")]
    Network(String),

    /// No answer within the configured bound
    #[error("generation timed out after {duration_ms}ms")]
    Timeout {
        /// Bound that was exceeded
        duration_ms: u64,
    },

    /// Text came back but could not be turned into the expected structure
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
