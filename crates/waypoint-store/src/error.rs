//! Store errors

/// Errors raised by a [`crate::DocumentStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The write condition did not hold
    #[error("condition failed for {key}: expected {expected}, found {found}")]
    ConditionFailed {
        /// Document key
        key: String,
        /// What the condition required
        expected: String,
        /// What the store held
        found: String,
    },

    /// Document required by the operation is missing
    #[error("document not found: {0}")]
    NotFound(String),

    /// Body could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend I/O failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the failure is a lost optimistic-concurrency race
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConditionFailed { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Backend(e.to_string())
    }
}
