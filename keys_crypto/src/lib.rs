//! Cryptographic identity layer: secp256k1 key pairs, recoverable ECDSA,
//! an HKDF/AES-256-GCM envelope, signed ECIES, and the device key bundle
//! authenticated against an external wallet signer.

pub mod bundle;
pub mod ecies;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod signer;

pub use bundle::{BundleVersion, KeyBundle, PrivateKeyBundle};
pub use ecies::SignedEciesCiphertext;
pub use envelope::Ciphertext;
pub use error::{BundleError, CryptoError};
pub use keys::{PrivateKey, PublicKey, Signature};
pub use signer::{personal_digest, DeviceSigner, LocalWalletSigner, WalletSigner};
