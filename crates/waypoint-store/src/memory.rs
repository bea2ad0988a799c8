//! In-process store backed by `DashMap`
//!
//! Each (table, partition) pair maps to an ordered map of sort keys, so
//! partition queries come back sorted and conditional writes are checked
//! under the partition's shard lock.

use crate::error::StoreError;
use crate::types::{Document, DocumentKey, WriteCondition};
use crate::DocumentStore;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone)]
struct Stored {
    revision: u64,
    body: Value,
}

type PartitionKey = (String, String);

/// Thread-safe in-memory [`DocumentStore`]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    partitions: DashMap<PartitionKey, BTreeMap<String, Stored>>,
}

impl InMemoryStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.value().len()).sum()
    }

    /// Whether the store holds no documents
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every document, ordered by key
    #[must_use]
    pub fn snapshot(&self) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .partitions
            .iter()
            .flat_map(|entry| {
                let (table, partition) = entry.key().clone();
                entry
                    .value()
                    .iter()
                    .map(|(sort, stored)| Document {
                        key: DocumentKey::new(table.clone(), partition.clone(), sort.clone()),
                        revision: stored.revision,
                        body: stored.body.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        docs.sort_by(|a, b| a.key.cmp(&b.key));
        docs
    }

    /// Write a JSON snapshot of the store to `path`
    ///
    /// # Errors
    ///
    /// [`StoreError::Serialization`] or [`StoreError::Backend`] on I/O failure.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.snapshot())?;
        tokio::fs::write(path.as_ref(), bytes).await?;
        tracing::debug!("saved {} documents to {}", self.len(), path.as_ref().display());
        Ok(())
    }

    /// Load a snapshot written by [`InMemoryStore::save`]
    ///
    /// # Errors
    ///
    /// [`StoreError::Serialization`] or [`StoreError::Backend`] on I/O failure.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let docs: Vec<Document> = serde_json::from_slice(&bytes)?;
        let store = Self::new();
        for doc in docs {
            store
                .partitions
                .entry((doc.key.table, doc.key.partition))
                .or_default()
                .insert(
                    doc.key.sort,
                    Stored {
                        revision: doc.revision,
                        body: doc.body,
                    },
                );
        }
        Ok(store)
    }

    fn condition_failed(key: &DocumentKey, expected: String, found: Option<u64>) -> StoreError {
        StoreError::ConditionFailed {
            key: key.to_string(),
            expected,
            found: found.map_or_else(|| "no document".to_string(), |r| format!("revision {r}")),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError> {
        let partition = (key.table.clone(), key.partition.clone());
        Ok(self.partitions.get(&partition).and_then(|docs| {
            docs.get(&key.sort).map(|stored| Document {
                key: key.clone(),
                revision: stored.revision,
                body: stored.body.clone(),
            })
        }))
    }

    async fn query(
        &self,
        table: &str,
        partition: &str,
        sort_prefix: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        let Some(docs) = self.partitions.get(&(table.to_string(), partition.to_string())) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(sort, _)| sort_prefix.map_or(true, |prefix| sort.starts_with(prefix)))
            .map(|(sort, stored)| Document {
                key: DocumentKey::new(table, partition, sort.clone()),
                revision: stored.revision,
                body: stored.body.clone(),
            })
            .collect())
    }

    async fn put(
        &self,
        key: DocumentKey,
        body: Value,
        condition: WriteCondition,
    ) -> Result<u64, StoreError> {
        let mut docs = self
            .partitions
            .entry((key.table.clone(), key.partition.clone()))
            .or_default();
        let current = docs.get(&key.sort).map(|s| s.revision);
        condition
            .check(current)
            .map_err(|expected| Self::condition_failed(&key, expected, current))?;

        let revision = current.unwrap_or(0) + 1;
        docs.insert(key.sort, Stored { revision, body });
        Ok(revision)
    }

    async fn update_fields(
        &self,
        key: &DocumentKey,
        fields: Map<String, Value>,
        condition: WriteCondition,
    ) -> Result<u64, StoreError> {
        let mut docs = self
            .partitions
            .get_mut(&(key.table.clone(), key.partition.clone()))
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let stored = docs
            .get_mut(&key.sort)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        condition
            .check(Some(stored.revision))
            .map_err(|expected| Self::condition_failed(key, expected, Some(stored.revision)))?;

        let Value::Object(body) = &mut stored.body else {
            return Err(StoreError::Backend(format!("{key} does not hold an object")));
        };
        body.extend(fields);
        stored.revision += 1;
        Ok(stored.revision)
    }

    async fn delete(&self, key: &DocumentKey, condition: WriteCondition) -> Result<bool, StoreError> {
        let Some(mut docs) = self
            .partitions
            .get_mut(&(key.table.clone(), key.partition.clone()))
        else {
            condition
                .check(None)
                .map_err(|expected| Self::condition_failed(key, expected, None))?;
            return Ok(false);
        };
        let current = docs.get(&key.sort).map(|s| s.revision);
        condition
            .check(current)
            .map_err(|expected| Self::condition_failed(key, expected, current))?;
        Ok(docs.remove(&key.sort).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(sort: &str) -> DocumentKey {
        DocumentKey::new("roadmaps", "a@b.c", sort)
    }

    #[tokio::test]
    async fn put_and_get_track_revisions() {
        let store = InMemoryStore::new();
        let r1 = store.put(key("1"), json!({"n": 1}), WriteCondition::MustNotExist).await.unwrap();
        let r2 = store.put(key("1"), json!({"n": 2}), WriteCondition::RevisionEquals(r1)).await.unwrap();
        assert_eq!((r1, r2), (1, 2));

        let doc = store.get(&key("1")).await.unwrap().unwrap();
        assert_eq!(doc.revision, 2);
        assert_eq!(doc.body, json!({"n": 2}));
    }

    #[tokio::test]
    async fn stale_revision_is_rejected_without_writing() {
        let store = InMemoryStore::new();
        store.put(key("1"), json!({"n": 1}), WriteCondition::Always).await.unwrap();
        store.put(key("1"), json!({"n": 2}), WriteCondition::Always).await.unwrap();

        let err = store
            .put(key("1"), json!({"n": 3}), WriteCondition::RevisionEquals(1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get(&key("1")).await.unwrap().unwrap().body, json!({"n": 2}));
    }

    #[tokio::test]
    async fn must_not_exist_guards_duplicates() {
        let store = InMemoryStore::new();
        store.put(key("x"), json!({}), WriteCondition::MustNotExist).await.unwrap();
        let err = store.put(key("x"), json!({}), WriteCondition::MustNotExist).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn query_is_sorted_and_prefix_filtered() {
        let store = InMemoryStore::new();
        for sort in ["b#2", "a#1", "b#1"] {
            store.put(key(sort), json!({}), WriteCondition::Always).await.unwrap();
        }
        let all: Vec<String> = store
            .query("roadmaps", "a@b.c", None)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.key.sort)
            .collect();
        assert_eq!(all, vec!["a#1", "b#1", "b#2"]);

        let b = store.query("roadmaps", "a@b.c", Some("b#")).await.unwrap();
        assert_eq!(b.len(), 2);
        assert!(store.query("roadmaps", "other", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_fields_merges_top_level_attributes() {
        let store = InMemoryStore::new();
        store.put(key("1"), json!({"a": 1, "b": 1}), WriteCondition::Always).await.unwrap();
        let mut fields = Map::new();
        fields.insert("b".into(), json!(2));
        let rev = store.update_fields(&key("1"), fields, WriteCondition::RevisionEquals(1)).await.unwrap();
        assert_eq!(rev, 2);
        assert_eq!(store.get(&key("1")).await.unwrap().unwrap().body, json!({"a": 1, "b": 2}));
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.update_fields(&key("nope"), Map::new(), WriteCondition::Always).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = InMemoryStore::new();
        store.put(key("1"), json!({}), WriteCondition::Always).await.unwrap();
        assert!(store.delete(&key("1"), WriteCondition::MustExist).await.unwrap());
        assert!(!store.delete(&key("1"), WriteCondition::Always).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_cas_has_exactly_one_winner() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        store.put(key("hot"), json!({"n": 0}), WriteCondition::Always).await.unwrap();

        let writers = (0..8).map(|n| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .put(key("hot"), json!({"n": n}), WriteCondition::RevisionEquals(1))
                    .await
                    .is_ok()
            })
        });
        let results = futures::future::join_all(writers).await;
        let winners = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn snapshot_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = InMemoryStore::new();
        store.put(key("1"), json!({"n": 1}), WriteCondition::Always).await.unwrap();
        store.put(key("1"), json!({"n": 2}), WriteCondition::Always).await.unwrap();
        store.save(&path).await.unwrap();

        let loaded = InMemoryStore::load(&path).await.unwrap();
        let doc = loaded.get(&key("1")).await.unwrap().unwrap();
        assert_eq!(doc.revision, 2);
        assert_eq!(loaded.snapshot(), store.snapshot());
    }
}
