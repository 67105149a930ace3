//! Revisioned append-log store.
//!
//! A per-collection list of conversation records that survives restarts,
//! merges concurrent appends from independent writers, and answers topic
//! lookups in O(1). The whole list is the unit of persistence: every write
//! is a read-modify-write of one serde_json document.
//!
//! Merge correctness is the central invariant. Persistence may be shared by
//! two live store instances (separate devices of the same user), so `add`
//! re-reads the latest persisted document immediately before writing
//! instead of trusting its own in-memory cache. The merge is a
//! duplicate-tolerant union keyed by topic, so concurrent additions
//! accumulate rather than overwrite each other.

pub mod records;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ds::Persistence;

use crate::error::StoreError;

pub use records::{ConversationRecord, Invitation, InvitationContext, RecordError};

/// The persisted document: the full ordered record list plus the revision
/// counter acting as the collection's logical clock.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    revision: u64,
    records: Vec<ConversationRecord>,
}

pub struct RevisionedStore {
    persistence: Arc<dyn Persistence>,
    storage_key: String,
    records: Vec<ConversationRecord>,
    by_topic: HashMap<String, usize>,
    revision: u64,
}

fn build_index(records: &[ConversationRecord]) -> HashMap<String, usize> {
    records
        .iter()
        .enumerate()
        .map(|(position, record)| (record.topic().to_string(), position))
        .collect()
}

impl RevisionedStore {
    /// Hydrate a store instance from whatever the persistence target
    /// currently holds for `storage_key`.
    pub async fn load(
        persistence: Arc<dyn Persistence>,
        storage_key: &str,
    ) -> Result<Self, StoreError> {
        let document = Self::fetch_document(&*persistence, storage_key).await?;
        let by_topic = build_index(&document.records);
        Ok(RevisionedStore {
            persistence,
            storage_key: storage_key.to_string(),
            records: document.records,
            by_topic,
            revision: document.revision,
        })
    }

    async fn fetch_document(
        persistence: &dyn Persistence,
        storage_key: &str,
    ) -> Result<StoreDocument, StoreError> {
        match persistence.get(storage_key).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(StoreDocument::default()),
        }
    }

    /// Append records to the collection.
    ///
    /// Individually malformed records are dropped with a warning without
    /// failing the batch. If at least one record is valid, the latest
    /// persisted document is re-read, the union of persisted, cached and
    /// new records is written back, and the revision advances by exactly
    /// one. A batch with no valid records performs no write and leaves the
    /// revision unchanged.
    ///
    /// Returns the number of records that were new to the collection.
    pub async fn add(&mut self, records: Vec<ConversationRecord>) -> Result<usize, StoreError> {
        let mut valid = Vec::with_capacity(records.len());
        for record in records {
            match record.validate() {
                Ok(()) => valid.push(record),
                Err(e) => warn!("dropping malformed record for {:?}: {e}", record.topic()),
            }
        }
        if valid.is_empty() {
            debug!("no valid records in batch; {} unchanged", self.storage_key);
            return Ok(0);
        }

        // Read-before-write: another writer may have appended since we last
        // looked, and its additions must survive our write.
        let latest = Self::fetch_document(&*self.persistence, &self.storage_key).await?;

        let mut merged = latest.records;
        let mut seen: HashSet<String> = merged
            .iter()
            .map(|record| record.topic().to_string())
            .collect();
        for record in &self.records {
            if seen.insert(record.topic().to_string()) {
                merged.push(record.clone());
            }
        }
        let mut added = 0;
        for record in valid {
            if seen.insert(record.topic().to_string()) {
                merged.push(record);
                added += 1;
            }
        }

        let document = StoreDocument {
            revision: latest.revision + 1,
            records: merged,
        };
        // Cached state is replaced only after the write lands; a failed set
        // leaves list, index and revision exactly as they were.
        self.persistence
            .set(&self.storage_key, &serde_json::to_vec(&document)?)
            .await?;

        self.by_topic = build_index(&document.records);
        self.records = document.records;
        self.revision = document.revision;
        debug!(
            "{}: revision {} with {} record(s), {added} new",
            self.storage_key,
            self.revision,
            self.records.len()
        );
        Ok(added)
    }

    /// O(1) topic lookup; unknown topics are absent, never an error.
    pub fn lookup(&self, topic: &str) -> Option<&ConversationRecord> {
        self.by_topic
            .get(topic)
            .map(|position| &self.records[*position])
    }

    pub fn records(&self) -> &[ConversationRecord] {
        &self.records
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
