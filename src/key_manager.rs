//! Key manager: generate-or-fetch-and-cache of the device key bundle,
//! authenticated against an external wallet signer and resilient to the
//! eventual consistency of network persistence.
//!
//! The storage secret is derived from a deterministic wallet signature over
//! a fixed enable-storage message. The derivation depends only on the
//! signature bytes, never on which signer object produced them, so a
//! software signer and a signing device bound to the same secret read each
//! other's bundles.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use ds::Persistence;
use keys_crypto::{ecies, KeyBundle, PrivateKey, PrivateKeyBundle, SignedEciesCiphertext, WalletSigner};

use crate::error::KeyManagerError;

/// Signed once by the wallet to authorize the encrypted key store. Changing
/// this text invalidates every stored bundle, so it is part of the wire
/// contract.
pub const STORAGE_ENABLE_MESSAGE: &str =
    "de-keys: enable encrypted storage\n\nThis signature authorizes reading and writing of this wallet's encrypted key store.";

/// Persistence key for the device bundle; the composed adapter stack
/// namespaces it per wallet.
pub const KEY_BUNDLE_STORAGE_KEY: &str = "key_bundle";

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Invoked exactly once after a bundle is successfully persisted; the only
/// operation in this layer that is not awaited.
pub type StoreNotifier = Box<dyn Fn(&KeyBundle) + Send + Sync>;

pub struct KeyManager {
    signer: Arc<dyn WalletSigner>,
    persistence: Arc<dyn Persistence>,
    notifier: Option<StoreNotifier>,
}

impl KeyManager {
    pub fn new(signer: Arc<dyn WalletSigner>, persistence: Arc<dyn Persistence>) -> Self {
        KeyManager {
            signer,
            persistence,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: StoreNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Derive the storage key pair from the wallet's deterministic
    /// signature over [`STORAGE_ENABLE_MESSAGE`].
    async fn storage_key(&self) -> Result<PrivateKey, KeyManagerError> {
        let signature = self
            .signer
            .sign_message(STORAGE_ENABLE_MESSAGE.as_bytes())
            .await?;
        let seed: [u8; 32] = Sha256::digest(signature.bytes()).into();
        Ok(PrivateKey::from_secret_bytes(&seed)?)
    }

    /// Serialize, self-encrypt and persist the bundle, then fire the
    /// notifier.
    pub async fn store_private_key_bundle(
        &self,
        bundle: &PrivateKeyBundle,
    ) -> Result<(), KeyManagerError> {
        let storage_key = self.storage_key().await?;
        let encoded = bundle.encode()?;
        let ciphertext = ecies::encrypt(&encoded, &storage_key.public, &storage_key)?;
        let value = serde_json::to_vec(&ciphertext)?;
        self.persistence.set(KEY_BUNDLE_STORAGE_KEY, &value).await?;
        info!("stored key bundle for wallet {}", self.signer.address());

        if let Some(notifier) = &self.notifier {
            notifier(&bundle.public_bundle());
        }
        Ok(())
    }

    /// Fetch and decrypt the persisted bundle.
    ///
    /// Absence is `Ok(None)` — the bundle may simply not have replicated
    /// yet — and callers retry via the polling helper. Integrity failures
    /// are errors: they mean tampering or a wrong key and must stop the
    /// caller instead of being retried.
    pub async fn load_private_key_bundle(
        &self,
    ) -> Result<Option<PrivateKeyBundle>, KeyManagerError> {
        let Some(stored) = self.persistence.get(KEY_BUNDLE_STORAGE_KEY).await? else {
            return Ok(None);
        };
        let ciphertext: SignedEciesCiphertext = serde_json::from_slice(&stored)?;
        let storage_key = self.storage_key().await?;
        let encoded = ecies::decrypt(&ciphertext, &storage_key, &storage_key.public)?;
        let bundle = PrivateKeyBundle::decode(&encoded)?;
        bundle.validate()?;
        Ok(Some(bundle))
    }

    /// Poll for the bundle until the caller-supplied deadline.
    ///
    /// Network persistence is eventually consistent: a load racing a store
    /// from another device may observe absence for a while. Only absence is
    /// retried; integrity and transport errors abort immediately.
    pub async fn load_private_key_bundle_with_deadline(
        &self,
        deadline: Duration,
    ) -> Result<Option<PrivateKeyBundle>, KeyManagerError> {
        let deadline = Instant::now() + deadline;
        loop {
            if let Some(bundle) = self.load_private_key_bundle().await? {
                return Ok(Some(bundle));
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("key bundle still absent at deadline");
                return Ok(None);
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Load the existing bundle or generate, store and return a fresh one.
    pub async fn get_or_create_bundle(&self) -> Result<PrivateKeyBundle, KeyManagerError> {
        if let Some(bundle) = self.load_private_key_bundle().await? {
            debug!("loaded existing key bundle");
            return Ok(bundle);
        }
        let bundle = PrivateKeyBundle::generate(&*self.signer).await?;
        self.store_private_key_bundle(&bundle).await?;
        Ok(bundle)
    }
}
