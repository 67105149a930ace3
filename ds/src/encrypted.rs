//! Authenticated-encryption decorator.
//!
//! Wraps any base adapter: `set` seals the value with signed ECIES before
//! storing, `get` loads and opens it. The same key both receives and signs,
//! so only the holder of the paired private key can read or forge entries.
//! Built without key material the decorator is a plain passthrough.

use std::sync::Arc;

use async_trait::async_trait;

use keys_crypto::{ecies, PrivateKey, SignedEciesCiphertext};

use crate::error::PersistenceError;
use crate::persistence::Persistence;

pub struct EncryptedPersistence {
    inner: Arc<dyn Persistence>,
    key: Option<PrivateKey>,
}

impl EncryptedPersistence {
    pub fn new(inner: Arc<dyn Persistence>, key: PrivateKey) -> Self {
        EncryptedPersistence {
            inner,
            key: Some(key),
        }
    }

    pub fn passthrough(inner: Arc<dyn Persistence>) -> Self {
        EncryptedPersistence { inner, key: None }
    }
}

#[async_trait]
impl Persistence for EncryptedPersistence {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let Some(stored) = self.inner.get(key).await? else {
            return Ok(None);
        };
        let Some(secret) = &self.key else {
            return Ok(Some(stored));
        };
        let ciphertext: SignedEciesCiphertext = serde_json::from_slice(&stored)?;
        let plaintext = ecies::decrypt(&ciphertext, secret, &secret.public)?;
        Ok(Some(plaintext))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        let Some(secret) = &self.key else {
            return self.inner.set(key, value).await;
        };
        let ciphertext = ecies::encrypt(value, &secret.public, secret)?;
        let stored = serde_json::to_vec(&ciphertext)?;
        self.inner.set(key, &stored).await
    }
}
