//! Parse error type

/// Failure to turn generator text into the requested structure
///
/// Both variants keep the untouched input for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// No JSON document could be recovered
    #[error("unparseable response: {reason}")]
    Unparseable {
        /// What went wrong
        reason: String,
        /// Original text
        raw: String,
    },

    /// JSON was found but does not have the expected shape
    #[error("unexpected response shape: {reason}")]
    Shape {
        /// What went wrong
        reason: String,
        /// Original text
        raw: String,
    },
}

impl ParseError {
    /// Build an [`ParseError::Unparseable`]
    #[must_use]
    pub fn unparseable(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Unparseable {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// Build a [`ParseError::Shape`]
    #[must_use]
    pub fn shape(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Shape {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// Original generator text
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Unparseable { raw, .. } | Self::Shape { raw, .. } => raw,
        }
    }
}
