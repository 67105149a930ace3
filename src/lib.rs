//! de-keys: local cryptographic identity and encrypted conversation-index
//! layer.
//!
//! The crate generates and authenticates a device's key bundle against an
//! external wallet signer, persists it confidentially across heterogeneous
//! storage backends, and maintains append-only indices of known
//! conversations and invites that stay correct when independent writers
//! append concurrently without coordination.
//!
//! - [`keys_crypto`] (re-exported): key pairs, recoverable ECDSA, the
//!   symmetric envelope, signed ECIES and the key bundle.
//! - [`ds`] (re-exported): the get/set persistence contract and its
//!   composable adapters, up to the topic-addressed network store.
//! - [`store`]: the revisioned append-log conversation index.
//! - [`key_manager`]: bundle generation, self-encryption, persistence and
//!   eventually-consistent retrieval.

pub mod error;
pub mod key_manager;
pub mod store;

pub use error::{KeyManagerError, StoreError};
pub use key_manager::{KeyManager, StoreNotifier, KEY_BUNDLE_STORAGE_KEY, STORAGE_ENABLE_MESSAGE};
pub use store::{ConversationRecord, Invitation, InvitationContext, RevisionedStore};

pub use ds;
pub use keys_crypto;
