//! A store wrapper that fails chosen operations on demand

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use waypoint_store::{Document, DocumentKey, DocumentStore, InMemoryStore, StoreError, WriteCondition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Write,
    Delete,
}

/// Passes everything through to an [`InMemoryStore`] until told to fail
#[derive(Debug)]
pub struct FaultyStore {
    inner: Arc<InMemoryStore>,
    failing: Mutex<HashSet<(Op, String)>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Fail every `put` and `update_fields` on `table`
    pub fn fail_writes(&self, table: &str) {
        self.failing.lock().insert((Op::Write, table.to_string()));
    }

    /// Fail every `delete` on `table`
    pub fn fail_deletes(&self, table: &str) {
        self.failing.lock().insert((Op::Delete, table.to_string()));
    }

    pub fn heal(&self) {
        self.failing.lock().clear();
    }

    fn check(&self, op: Op, key: &DocumentKey) -> Result<(), StoreError> {
        if self.failing.lock().contains(&(op, key.table.clone())) {
            Err(StoreError::Backend(format!("injected {op:?} failure on {key}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError> {
        self.inner.get(key).await
    }

    async fn query(
        &self,
        table: &str,
        partition: &str,
        sort_prefix: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.query(table, partition, sort_prefix).await
    }

    async fn put(&self, key: DocumentKey, body: Value, condition: WriteCondition) -> Result<u64, StoreError> {
        self.check(Op::Write, &key)?;
        self.inner.put(key, body, condition).await
    }

    async fn update_fields(
        &self,
        key: &DocumentKey,
        fields: Map<String, Value>,
        condition: WriteCondition,
    ) -> Result<u64, StoreError> {
        self.check(Op::Write, key)?;
        self.inner.update_fields(key, fields, condition).await
    }

    async fn delete(&self, key: &DocumentKey, condition: WriteCondition) -> Result<bool, StoreError> {
        self.check(Op::Delete, key)?;
        self.inner.delete(key, condition).await
    }
}
