//! Waypoint document store
//!
//! Records live in tables, addressed by a partition key (the user's
//! identity) and a sort key (the aggregate's identity). The backing store
//! has no optimistic-concurrency primitive of its own, so every document
//! carries a `revision` stamp maintained here, and every write states a
//! [`WriteCondition`] that is checked atomically with the write.

pub mod error;
pub mod memory;
pub mod types;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use types::{Document, DocumentKey, WriteCondition};

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Keyed document storage with conditional writes
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError>;

    /// All documents in `table` under `partition`, ascending by sort key,
    /// optionally restricted to sort keys starting with `sort_prefix`
    async fn query(
        &self,
        table: &str,
        partition: &str,
        sort_prefix: Option<&str>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Write the whole body; returns the new revision
    async fn put(
        &self,
        key: DocumentKey,
        body: Value,
        condition: WriteCondition,
    ) -> Result<u64, StoreError>;

    /// Overwrite top-level attributes of an existing document; returns the new revision
    async fn update_fields(
        &self,
        key: &DocumentKey,
        fields: Map<String, Value>,
        condition: WriteCondition,
    ) -> Result<u64, StoreError>;

    /// Remove a document; returns whether it existed
    async fn delete(&self, key: &DocumentKey, condition: WriteCondition) -> Result<bool, StoreError>;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
