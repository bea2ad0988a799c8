//! Keys, documents and write conditions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Address of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Table name
    pub table: String,
    /// Partition key, the owning user's identity
    pub partition: String,
    /// Sort key, the aggregate's identity
    pub sort: String,
}

impl DocumentKey {
    /// Build a key
    #[must_use]
    pub fn new(table: impl Into<String>, partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.table, self.partition, self.sort)
    }
}

/// Stored document with its revision stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Address
    pub key: DocumentKey,
    /// Monotonic revision, 1 on first write
    pub revision: u64,
    /// Record body
    pub body: Value,
}

/// Guard evaluated atomically with a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Unconditional
    Always,
    /// Only if no document exists at the key
    MustNotExist,
    /// Only if a document exists at the key
    MustExist,
    /// Only if the stored revision equals the given one
    RevisionEquals(u64),
}

impl WriteCondition {
    /// Check the condition against the current revision (`None` if absent)
    ///
    /// Returns a description of the expectation on failure.
    #[must_use]
    pub fn check(self, current: Option<u64>) -> Result<(), String> {
        match (self, current) {
            (Self::Always, _) | (Self::MustNotExist, None) | (Self::MustExist, Some(_)) => Ok(()),
            (Self::RevisionEquals(want), Some(have)) if want == have => Ok(()),
            (Self::MustNotExist, Some(_)) => Err("no document".into()),
            (Self::MustExist, None) => Err("an existing document".into()),
            (Self::RevisionEquals(want), _) => Err(format!("revision {want}")),
        }
    }
}
