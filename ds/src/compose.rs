//! Adapter-selection policy.
//!
//! Composition order is fixed: choose the base store, then optionally wrap
//! with namespacing, then optionally wrap with authenticated encryption.
//! Identical flags always yield the identical composition, regardless of
//! call site.

use std::sync::Arc;

use keys_crypto::PrivateKey;

use crate::encrypted::EncryptedPersistence;
use crate::persistence::{InMemoryPersistence, Persistence, PrefixedPersistence};

#[derive(Clone, Copy, Debug, Default)]
pub struct StoreOptions {
    /// Store values in the clear instead of sealing them with ECIES.
    pub disable_persistence_encryption: bool,
    /// Persist to the durable backend; when off, state lives and dies with
    /// the process.
    pub persist_conversations: bool,
}

/// Compose the persistence stack for one subsystem.
///
/// `durable` is the shared long-lived backend (typically network-backed);
/// `namespace` isolates this subsystem's keys inside it; `key` is the
/// device key material used for encryption at rest.
pub fn build_persistence(
    options: StoreOptions,
    durable: Arc<dyn Persistence>,
    namespace: &str,
    key: PrivateKey,
) -> Arc<dyn Persistence> {
    let base: Arc<dyn Persistence> = if options.persist_conversations {
        durable
    } else {
        Arc::new(InMemoryPersistence::new())
    };

    let namespaced: Arc<dyn Persistence> = if namespace.is_empty() {
        base
    } else {
        Arc::new(PrefixedPersistence::new(namespace, base))
    };

    if options.disable_persistence_encryption {
        Arc::new(EncryptedPersistence::passthrough(namespaced))
    } else {
        Arc::new(EncryptedPersistence::new(namespaced, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(encrypting: bool, persisting: bool) -> StoreOptions {
        StoreOptions {
            disable_persistence_encryption: !encrypting,
            persist_conversations: persisting,
        }
    }

    #[tokio::test]
    async fn encrypting_composition_never_lands_plaintext_in_the_backend() {
        let durable: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::new());
        let store = build_persistence(
            options(true, true),
            durable.clone(),
            "conversations",
            PrivateKey::generate(),
        );

        store.set("topic-a", b"plaintext record").await.expect("set failed");
        let raw = durable
            .get("conversations/topic-a")
            .await
            .expect("get failed")
            .expect("missing raw value");
        assert!(!raw.windows(16).any(|w| w == b"plaintext record"));
    }

    #[tokio::test]
    async fn plaintext_composition_writes_through() {
        let durable: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::new());
        let store = build_persistence(
            options(false, true),
            durable.clone(),
            "conversations",
            PrivateKey::generate(),
        );

        store.set("topic-a", b"record").await.expect("set failed");
        assert_eq!(
            durable.get("conversations/topic-a").await.expect("get failed"),
            Some(b"record".to_vec())
        );
    }

    #[tokio::test]
    async fn non_persisting_composition_never_touches_the_backend() {
        let durable: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::new());
        let store = build_persistence(
            options(true, false),
            durable.clone(),
            "conversations",
            PrivateKey::generate(),
        );

        store.set("topic-a", b"record").await.expect("set failed");
        assert_eq!(store.get("topic-a").await.expect("get failed"), Some(b"record".to_vec()));
        assert_eq!(
            durable.get("conversations/topic-a").await.expect("get failed"),
            None
        );
    }

    #[tokio::test]
    async fn identical_flags_compose_identically() {
        // Same flags + same key material must produce interchangeable
        // stacks: what one composition writes, another reads.
        let durable: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::new());
        let key = PrivateKey::generate();
        let first = build_persistence(
            options(true, true),
            durable.clone(),
            "conversations",
            key.clone(),
        );
        let second = build_persistence(options(true, true), durable, "conversations", key);

        first.set("topic-a", b"record").await.expect("set failed");
        assert_eq!(
            second.get("topic-a").await.expect("get failed"),
            Some(b"record".to_vec())
        );
    }
}
