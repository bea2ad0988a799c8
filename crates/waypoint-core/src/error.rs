//! Error types for Waypoint Core
//!
//! Every public operation either succeeds with a complete snapshot or fails
//! with one of these, leaving persisted state as it was.

use waypoint_llm::GenerationError;
use waypoint_model::ModelError;
use waypoint_parser::ParseError;
use waypoint_store::StoreError;

/// Main Waypoint error type
#[derive(Debug, thiserror::Error)]
pub enum WaypointError {
    /// Precondition or state-guard failure
    #[error("validation failed: {0}")]
    Validation(String),

    /// Backend call failed or returned nothing, after the strict retry
    #[error("generation failed: {0}")]
    Generation(GenerationError),

    /// Backend output unusable, after the strict retry
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    /// Concurrent modification or duplicate creation
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing aggregate
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Aggregate kind
        kind: &'static str,
        /// Identifier looked up
        id: String,
    },

    /// Store failure other than a conflict
    #[error("store error: {0}")]
    Store(StoreError),

    /// Store or backend call exceeded its bound
    #[error("operation timed out after {duration_ms}ms")]
    Timeout {
        /// Bound that was exceeded
        duration_ms: u64,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl WaypointError {
    /// Shorthand for [`WaypointError::NotFound`]
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Check if the caller may retry the whole operation
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Timeout { .. })
    }

    /// Taxonomy name used as the structured failure reason
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Generation(_) => "generation",
            Self::Parse(_) => "parse",
            Self::Conflict(_) => "conflict",
            Self::NotFound { .. } => "not_found",
            Self::Store(_) => "store",
            Self::Timeout { .. } => "timeout",
            Self::Config(_) => "config",
        }
    }
}

impl From<GenerationError> for WaypointError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Parse(parse) => Self::Parse(parse),
            GenerationError::Timeout { duration_ms } => Self::Timeout { duration_ms },
            other => Self::Generation(other),
        }
    }
}

impl From<StoreError> for WaypointError {
    fn from(e: StoreError) -> Self {
        if e.is_conflict() {
            metrics::counter!("waypoint_store_conflicts_total").increment(1);
            return Self::Conflict(e.to_string());
        }
        match e {
            StoreError::NotFound(key) => Self::NotFound {
                kind: "document",
                id: key,
            },
            other => Self::Store(other),
        }
    }
}

impl From<ModelError> for WaypointError {
    fn from(e: ModelError) -> Self {
        Self::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failures_keep_their_category() {
        let err: WaypointError = GenerationError::Parse(ParseError::unparseable("x", "raw")).into();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn store_conflicts_become_conflicts() {
        let err: WaypointError = StoreError::ConditionFailed {
            key: "k".into(),
            expected: "revision 1".into(),
            found: "revision 2".into(),
        }
        .into();
        assert!(matches!(err, WaypointError::Conflict(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn validation_is_not_retryable() {
        assert!(!WaypointError::Validation("nope".into()).is_retryable());
    }
}
