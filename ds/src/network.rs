//! Topic-addressed network store.
//!
//! The transport exposes append-only topics: publishing adds an envelope,
//! querying returns the newest page. [`NetworkPersistence`] bends that into
//! the get/set contract by treating "first non-empty payload on the newest
//! page" as the current value of a key. That is a tail-log read, not a map
//! read: propagation is eventually consistent, so "first observed" is not
//! necessarily "globally latest". Payloads that need ordering (the
//! revisioned store document) carry their own revision counter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{PersistenceError, TransportError};
use crate::persistence::Persistence;
use crate::topic::build_wallet_topic;

/// Bounded page size for `get` reads: latency stays proportional to one
/// round trip, not to full topic history.
pub const QUERY_PAGE_SIZE: usize = 5;

/// One entry on a topic's append log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    pub timestamp_ns: i64,
    pub payload: Vec<u8>,
}

/// Append-log topic transport. `query_latest` must return envelopes newest
/// first; that ordering is an external guarantee this layer relies on.
#[async_trait]
pub trait TopicTransport: Send + Sync {
    async fn query_latest(
        &self,
        topic: &str,
        page_size: usize,
    ) -> Result<Vec<Envelope>, TransportError>;

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;
}

/// Persistence adapter over a topic transport. `set` appends and never
/// mutates or deletes prior entries.
pub struct NetworkPersistence {
    transport: Arc<dyn TopicTransport>,
    namespace: String,
}

impl NetworkPersistence {
    pub fn new(transport: Arc<dyn TopicTransport>, namespace: &str) -> Self {
        NetworkPersistence {
            transport,
            namespace: namespace.to_string(),
        }
    }

    /// Keys here are wallet-scoped identifiers, so the topic derivation
    /// case-normalizes: checksummed and plain spellings of an address must
    /// land on the same topic.
    fn topic_for(&self, key: &str) -> String {
        build_wallet_topic(&self.namespace, key)
    }
}

#[async_trait]
impl Persistence for NetworkPersistence {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let topic = self.topic_for(key);
        let envelopes = self
            .transport
            .query_latest(&topic, QUERY_PAGE_SIZE)
            .await?;
        debug!("queried topic {topic}: {} envelope(s)", envelopes.len());
        Ok(envelopes
            .into_iter()
            .find(|envelope| !envelope.payload.is_empty())
            .map(|envelope| envelope.payload))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        let topic = self.topic_for(key);
        self.transport.publish(&topic, value).await?;
        Ok(())
    }
}

/// In-process transport: one append log per topic, newest-first queries.
/// Stands in for the network in tests and lets several stores share one
/// eventually-consistent target.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    topics: Mutex<HashMap<String, Vec<Envelope>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        InMemoryTransport::default()
    }

    /// Number of envelopes ever appended to a topic; appends are never
    /// compacted away.
    pub async fn history_len(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .await
            .get(topic)
            .map_or(0, |log| log.len())
    }
}

#[async_trait]
impl TopicTransport for InMemoryTransport {
    async fn query_latest(
        &self,
        topic: &str,
        page_size: usize,
    ) -> Result<Vec<Envelope>, TransportError> {
        let topics = self.topics.lock().await;
        let Some(log) = topics.get(topic) else {
            return Ok(Vec::new());
        };
        Ok(log.iter().rev().take(page_size).cloned().collect())
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let envelope = Envelope {
            topic: topic.to_string(),
            timestamp_ns: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            payload: payload.to_vec(),
        };
        self.topics
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(envelope);
        Ok(())
    }
}
