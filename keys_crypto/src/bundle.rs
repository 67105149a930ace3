//! Device key bundles: a wallet-signed identity key paired with an
//! identity-signed prekey.
//!
//! The bundle is the asserted device identity. The identity key is anchored
//! to an external wallet via an EIP-191 signature over the key bytes; the
//! prekey is endorsed by the identity key and rotates per session epoch.
//! Legacy v1 bundles carried unsigned keys and must still decode, so the
//! wire format is an explicit versioned table rather than field sniffing.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{BundleError, CryptoError};
use crate::keys::{PrivateKey, PublicKey};
use crate::signer::{personal_digest, WalletSigner};

use alloy::primitives::Address;

/// The public half of a device identity: what gets published to peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBundle {
    pub identity_key: PublicKey,
    pub pre_key: PublicKey,
}

impl KeyBundle {
    /// A bundle is valid only when the prekey signature recovers to the
    /// identity key.
    pub fn validate(&self) -> Result<(), BundleError> {
        if self.identity_key.signature.is_none() {
            return Err(BundleError::UnsignedIdentityKey);
        }
        if self.pre_key.signature.is_none() {
            return Err(BundleError::UnsignedPreKey);
        }
        self.pre_key
            .verify_key_signature(&self.identity_key)
            .map_err(|_| BundleError::PreKeySignatureInvalid)
    }

    /// Recover the wallet address that signed the identity key.
    pub fn recover_wallet_address(&self) -> Result<Address, BundleError> {
        let signature = self
            .identity_key
            .signature
            .as_ref()
            .ok_or(BundleError::UnsignedIdentityKey)?;
        let digest = personal_digest(self.identity_key.bytes());
        signature
            .ethereum_address(&digest)
            .ok_or(BundleError::PreKeySignatureInvalid)
    }
}

/// Wire-format versions this crate can decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleVersion {
    /// Legacy: unsigned, non-namespaced keys. Decode-only.
    V1,
    /// Current: wallet-signed identity key + identity-signed prekey.
    V2,
}

/// The private half of a device identity, held locally and persisted only
/// inside an encrypted envelope.
#[derive(Clone, Debug)]
pub struct PrivateKeyBundle {
    pub identity_key: PrivateKey,
    pub pre_key: PrivateKey,
    version: BundleVersion,
}

#[derive(Serialize, Deserialize)]
struct EncodedKey {
    secret: Vec<u8>,
    public: PublicKey,
}

/// Versioned decode table for persisted bundles. Encoding always emits V2;
/// decoding accepts both rows.
#[derive(Serialize, Deserialize)]
#[serde(tag = "version")]
enum EncodedBundle {
    V1 {
        identity_key: EncodedKey,
        pre_key: EncodedKey,
    },
    V2 {
        identity_key: EncodedKey,
        pre_key: EncodedKey,
    },
}

fn decode_key(encoded: EncodedKey, missing: BundleError) -> Result<PrivateKey, BundleError> {
    if encoded.secret.is_empty() {
        return Err(missing);
    }
    let mut key = PrivateKey::from_secret_bytes(&encoded.secret)?;
    if key.public.bytes() != encoded.public.bytes() {
        return Err(BundleError::CryptoError(CryptoError::InvalidKeyBytes));
    }
    key.public = encoded.public;
    Ok(key)
}

fn encode_key(key: &PrivateKey) -> EncodedKey {
    EncodedKey {
        secret: key.secret_bytes().to_vec(),
        public: key.public.clone(),
    }
}

impl PrivateKeyBundle {
    /// Generate a fresh bundle authenticated by `signer`: the wallet signs
    /// the identity key, the identity key signs the prekey.
    pub async fn generate(signer: &dyn WalletSigner) -> Result<Self, BundleError> {
        let now = Utc::now().timestamp_nanos_opt();

        let mut identity_key = PrivateKey::generate();
        let identity_bytes = identity_key.public.bytes().to_vec();
        let wallet_signature = signer.sign_message(&identity_bytes).await?;
        identity_key.public.signature = Some(wallet_signature);
        identity_key.public.created_ns = now;

        let mut pre_key = PrivateKey::generate();
        let pre_key_digest = pre_key.public.signing_digest();
        pre_key.public.signature = Some(identity_key.sign(&pre_key_digest));
        pre_key.public.created_ns = now;

        Ok(PrivateKeyBundle {
            identity_key,
            pre_key,
            version: BundleVersion::V2,
        })
    }

    pub fn version(&self) -> BundleVersion {
        self.version
    }

    pub fn public_bundle(&self) -> KeyBundle {
        KeyBundle {
            identity_key: self.identity_key.public.clone(),
            pre_key: self.pre_key.public.clone(),
        }
    }

    /// Signature checks apply to V2 bundles; legacy V1 bundles predate key
    /// signing and are accepted as-is.
    pub fn validate(&self) -> Result<(), BundleError> {
        match self.version {
            BundleVersion::V1 => Ok(()),
            BundleVersion::V2 => self.public_bundle().validate(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, BundleError> {
        let encoded = EncodedBundle::V2 {
            identity_key: encode_key(&self.identity_key),
            pre_key: encode_key(&self.pre_key),
        };
        Ok(serde_json::to_vec(&encoded)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BundleError> {
        let encoded: EncodedBundle = serde_json::from_slice(bytes)?;
        let (identity_key, pre_key, version) = match encoded {
            EncodedBundle::V1 {
                identity_key,
                pre_key,
            } => (identity_key, pre_key, BundleVersion::V1),
            EncodedBundle::V2 {
                identity_key,
                pre_key,
            } => (identity_key, pre_key, BundleVersion::V2),
        };
        Ok(PrivateKeyBundle {
            identity_key: decode_key(identity_key, BundleError::MissingIdentityKey)?,
            pre_key: decode_key(pre_key, BundleError::MissingPreKey)?,
            version,
        })
    }
}
