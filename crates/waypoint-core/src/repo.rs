//! Typed access to the document store
//!
//! The single place where records are encoded to and decoded from store
//! documents. Every store call is bounded by the configured timeout, and
//! updates are compare-and-swap on the record's revision stamp.

use crate::error::WaypointError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use waypoint_model::{Assessment, Profile, Roadmap, UserJourney};
use waypoint_store::{Document, DocumentKey, DocumentStore, StoreError, WriteCondition};

/// Table names
pub mod tables {
    /// One journey per user
    pub const JOURNEYS: &str = "journeys";
    /// Roadmap history per user
    pub const ROADMAPS: &str = "roadmaps";
    /// Assessments per user, keyed `{roadmap_id}#{topic}`
    pub const ASSESSMENTS: &str = "assessments";
    /// Profile versions per user
    pub const PROFILES: &str = "profiles";
}

/// A record stored as one document
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Table holding this record kind
    const TABLE: &'static str;
    /// Kind name used in errors
    const KIND: &'static str;

    /// Partition key (owning user)
    fn partition(&self) -> &str;
    /// Sort key (aggregate identity)
    fn sort_key(&self) -> String;
    /// Revision stamp last read or written
    fn revision(&self) -> u64;
    /// Store a new revision stamp
    fn set_revision(&mut self, revision: u64);

    /// Schema check run before every write
    ///
    /// # Errors
    ///
    /// [`WaypointError::Validation`] for an inconsistent record.
    fn check(&self) -> Result<(), WaypointError> {
        Ok(())
    }

    /// Store key of this record
    fn key(&self) -> DocumentKey {
        DocumentKey::new(Self::TABLE, self.partition(), self.sort_key())
    }
}

/// Sort key of the single journey document
pub const JOURNEY_SORT_KEY: &str = "journey";

impl Record for UserJourney {
    const TABLE: &'static str = tables::JOURNEYS;
    const KIND: &'static str = "journey";

    fn partition(&self) -> &str {
        &self.email
    }
    fn sort_key(&self) -> String {
        JOURNEY_SORT_KEY.to_string()
    }
    fn revision(&self) -> u64 {
        self.revision
    }
    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }
}

impl Record for Roadmap {
    const TABLE: &'static str = tables::ROADMAPS;
    const KIND: &'static str = "roadmap";

    fn partition(&self) -> &str {
        &self.email
    }
    fn sort_key(&self) -> String {
        self.id.to_string()
    }
    fn revision(&self) -> u64 {
        self.revision
    }
    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }
    fn check(&self) -> Result<(), WaypointError> {
        Ok(self.check_invariants()?)
    }
}

impl Record for Assessment {
    const TABLE: &'static str = tables::ASSESSMENTS;
    const KIND: &'static str = "assessment";

    fn partition(&self) -> &str {
        &self.email
    }
    fn sort_key(&self) -> String {
        Assessment::sort_key(self.roadmap_id, &self.topic)
    }
    fn revision(&self) -> u64 {
        self.revision
    }
    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }
}

impl Record for Profile {
    const TABLE: &'static str = tables::PROFILES;
    const KIND: &'static str = "profile";

    fn partition(&self) -> &str {
        &self.email
    }
    fn sort_key(&self) -> String {
        Profile::sort_key(self.version)
    }
    fn revision(&self) -> u64 {
        self.revision
    }
    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }
}

/// Typed, timeout-bounded view over a [`DocumentStore`]
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Wrap `store`, bounding every call by `timeout`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Fetch one record
    ///
    /// # Errors
    ///
    /// Store, decode or timeout failures.
    pub async fn get<T: Record>(&self, partition: &str, sort: &str) -> Result<Option<T>, WaypointError> {
        let key = DocumentKey::new(T::TABLE, partition, sort);
        let doc = self.bounded(self.store.get(&key)).await?;
        doc.map(decode).transpose()
    }

    /// Fetch one record or fail with [`WaypointError::NotFound`]
    ///
    /// # Errors
    ///
    /// As [`Repository::get`], plus `NotFound`.
    pub async fn require<T: Record>(&self, partition: &str, sort: &str) -> Result<T, WaypointError> {
        self.get(partition, sort)
            .await?
            .ok_or_else(|| WaypointError::not_found(T::KIND, sort))
    }

    /// Records under `partition`, ascending by sort key
    ///
    /// # Errors
    ///
    /// Store, decode or timeout failures.
    pub async fn query<T: Record>(&self, partition: &str, sort_prefix: Option<&str>) -> Result<Vec<T>, WaypointError> {
        let docs = self
            .bounded(self.store.query(T::TABLE, partition, sort_prefix))
            .await?;
        docs.into_iter().map(decode).collect()
    }

    /// Create a record that must not exist yet
    ///
    /// # Errors
    ///
    /// [`WaypointError::Conflict`] if it already exists.
    pub async fn insert<T: Record>(&self, record: &mut T) -> Result<(), WaypointError> {
        self.write(record, WriteCondition::MustNotExist).await
    }

    /// Replace a record if nobody changed it since it was read
    ///
    /// # Errors
    ///
    /// [`WaypointError::Conflict`] if the stored revision moved on.
    pub async fn update<T: Record>(&self, record: &mut T) -> Result<(), WaypointError> {
        let condition = WriteCondition::RevisionEquals(record.revision());
        self.write(record, condition).await
    }

    /// Write only the named top-level fields of `record`, if nobody changed
    /// it since it was read
    ///
    /// Fields outside `names` keep whatever the store holds.
    ///
    /// # Errors
    ///
    /// [`WaypointError::Conflict`] if the stored revision moved on;
    /// [`WaypointError::Validation`] for a name `record` does not serialize.
    pub async fn update_fields<T: Record>(&self, record: &mut T, names: &[&str]) -> Result<(), WaypointError> {
        record.check()?;
        let serde_json::Value::Object(mut body) = serde_json::to_value(&*record).map_err(StoreError::from)? else {
            return Err(WaypointError::Validation(format!("{} is not stored as an object", T::KIND)));
        };
        let mut fields = serde_json::Map::new();
        for name in names {
            let value = body
                .remove(*name)
                .ok_or_else(|| WaypointError::Validation(format!("{} has no field {name}", T::KIND)))?;
            fields.insert((*name).to_string(), value);
        }
        let key = record.key();
        let condition = WriteCondition::RevisionEquals(record.revision());
        tracing::debug!("updating {names:?} of {key}");
        let revision = self
            .bounded(self.store.update_fields(&key, fields, condition))
            .await?;
        record.set_revision(revision);
        Ok(())
    }

    /// Remove a record, returning whether it existed
    ///
    /// Unconditional: deletes only come from cascades that drop whatever is
    /// present, so a concurrent edit of the victim must not block them and a
    /// record already gone counts as removed.
    ///
    /// # Errors
    ///
    /// Store or timeout failures.
    pub async fn delete<T: Record>(&self, partition: &str, sort: &str) -> Result<bool, WaypointError> {
        let key = DocumentKey::new(T::TABLE, partition, sort);
        self.bounded(self.store.delete(&key, WriteCondition::Always)).await
    }

    async fn write<T: Record>(&self, record: &mut T, condition: WriteCondition) -> Result<(), WaypointError> {
        record.check()?;
        let body = serde_json::to_value(&*record).map_err(StoreError::from)?;
        let key = record.key();
        tracing::debug!("writing {key} ({condition:?})");
        let revision = self.bounded(self.store.put(key, body, condition)).await?;
        record.set_revision(revision);
        Ok(())
    }

    async fn bounded<F, R>(&self, call: F) -> Result<R, WaypointError>
    where
        F: Future<Output = Result<R, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(WaypointError::from),
            Err(_) => Err(WaypointError::Timeout {
                duration_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

fn decode<T: Record>(doc: Document) -> Result<T, WaypointError> {
    let mut record: T = serde_json::from_value(doc.body).map_err(StoreError::from)?;
    record.set_revision(doc.revision);
    Ok(record)
}
