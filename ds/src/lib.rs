//! Persistence adapters and the topic-addressed network store.
//!
//! Everything here speaks one contract, [`persistence::Persistence`]:
//! `get(key) -> bytes | None`, `set(key, bytes)`. Adapters compose by
//! wrapping each other, from an in-process map up to an append-only network
//! topic sealed with authenticated encryption.

pub mod compose;
pub mod encrypted;
pub mod error;
pub mod network;
pub mod persistence;
pub mod topic;

pub use compose::{build_persistence, StoreOptions};
pub use encrypted::EncryptedPersistence;
pub use error::{PersistenceError, TransportError};
pub use network::{Envelope, InMemoryTransport, NetworkPersistence, TopicTransport};
pub use persistence::{InMemoryPersistence, Persistence, PrefixedPersistence};
pub use topic::{
    build_topic, build_wallet_topic, CONVERSATIONS_NAMESPACE, INVITES_NAMESPACE,
    PRIVATE_STORE_NAMESPACE,
};
