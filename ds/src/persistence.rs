//! Minimal byte-store contract and its local adapters.
//!
//! Adapters compose by wrapping: each decorator owns an inner
//! `Arc<dyn Persistence>` and forwards or transforms calls. Keys are opaque
//! UTF-8 strings, values opaque bytes; nothing below this layer enforces a
//! schema.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::PersistenceError;

/// Get/set byte-store contract. Absence is `None`, never an error;
/// transport failures propagate unchanged.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError>;
}

/// Process-lifetime map; contents are lost on teardown.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        InMemoryPersistence::default()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        self.entries.lock().await.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Deterministically prefixes every key before delegating, so subsystems
/// sharing one physical store cannot collide.
pub struct PrefixedPersistence {
    prefix: String,
    inner: Arc<dyn Persistence>,
}

impl PrefixedPersistence {
    pub fn new(prefix: &str, inner: Arc<dyn Persistence>) -> Self {
        PrefixedPersistence {
            prefix: prefix.to_string(),
            inner,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}/{}", self.prefix, key)
    }
}

#[async_trait]
impl Persistence for PrefixedPersistence {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        self.inner.get(&self.full_key(key)).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        self.inner.set(&self.full_key(key), value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_get_set() {
        let store = InMemoryPersistence::new();
        assert_eq!(store.get("missing").await.expect("get failed"), None);

        store.set("k", b"v").await.expect("set failed");
        assert_eq!(store.get("k").await.expect("get failed"), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn prefixes_keep_subsystems_apart() {
        let base: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::new());
        let keys = PrefixedPersistence::new("keys", base.clone());
        let convos = PrefixedPersistence::new("conversations", base.clone());

        keys.set("shared", b"from keys").await.expect("set failed");
        convos.set("shared", b"from convos").await.expect("set failed");

        assert_eq!(
            keys.get("shared").await.expect("get failed"),
            Some(b"from keys".to_vec())
        );
        assert_eq!(
            convos.get("shared").await.expect("get failed"),
            Some(b"from convos".to_vec())
        );
        // The composed key is what lands in the base store.
        assert_eq!(
            base.get("keys/shared").await.expect("get failed"),
            Some(b"from keys".to_vec())
        );
        assert_eq!(base.get("shared").await.expect("get failed"), None);
    }
}
