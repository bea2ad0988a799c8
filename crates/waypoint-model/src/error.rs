//! Model-level validation errors

/// Errors raised when building or checking domain records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Stage name not part of the journey
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    /// Status name not recognised for the record kind
    #[error("unknown {kind} status: {value}")]
    UnknownStatus {
        /// Record kind ("roadmap", "assessment", ...)
        kind: &'static str,
        /// Offending value
        value: String,
    },

    /// Identifier failed to parse
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// Required field missing or record shape inconsistent
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
