//! Secp256k1 key pairs and recoverable ECDSA signatures.
//!
//! Every identity in the protocol bottoms out here: a [`PrivateKey`] is a
//! locally generated secret scalar, a [`PublicKey`] is the curve point we
//! gossip around (optionally carrying the signature that authenticates it),
//! and a [`Signature`] is a compact recoverable ECDSA signature that lets us
//! bind keys to external wallet addresses without asking the wallet for
//! anything protocol specific.

use alloy::primitives::{keccak256, Address};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

pub const SIGNATURE_LEN: usize = 64;
pub const SECRET_KEY_LEN: usize = 32;
/// Uncompressed SEC1 encoding: 0x04 prefix + 32-byte x + 32-byte y.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Compact recoverable ECDSA signature over secp256k1.
///
/// Invariant: exactly 64 signature bytes and a recovery bit of 0 or 1,
/// both checked on construction. Serde decoding goes through the same
/// validating constructor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSignature", into = "RawSignature")]
pub struct Signature {
    bytes: Vec<u8>,
    recovery_id: u8,
}

#[derive(Serialize, Deserialize)]
struct RawSignature {
    bytes: Vec<u8>,
    recovery_id: u8,
}

impl TryFrom<RawSignature> for Signature {
    type Error = CryptoError;

    fn try_from(raw: RawSignature) -> Result<Self, Self::Error> {
        Signature::new(raw.bytes, raw.recovery_id)
    }
}

impl From<Signature> for RawSignature {
    fn from(signature: Signature) -> Self {
        RawSignature {
            bytes: signature.bytes,
            recovery_id: signature.recovery_id,
        }
    }
}

impl Signature {
    pub fn new(bytes: Vec<u8>, recovery_id: u8) -> Result<Self, CryptoError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(CryptoError::InvalidSignatureLength(bytes.len()));
        }
        if recovery_id > 1 {
            return Err(CryptoError::InvalidRecoveryBit(recovery_id));
        }
        Ok(Signature { bytes, recovery_id })
    }

    /// Parse a 65-byte `r || s || v` signature as produced by Ethereum
    /// wallets. `v` values of 27/28 are normalized down to 0/1.
    pub fn from_raw(raw: &[u8]) -> Result<Self, CryptoError> {
        if raw.len() != SIGNATURE_LEN + 1 {
            return Err(CryptoError::InvalidSignatureLength(raw.len()));
        }
        let v = raw[SIGNATURE_LEN];
        let recovery_id = if v >= 27 { v - 27 } else { v };
        Signature::new(raw[..SIGNATURE_LEN].to_vec(), recovery_id)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn recovery_id(&self) -> u8 {
        self.recovery_id
    }

    /// Recover the signing public key from this signature and the digest it
    /// was made over. Recovery failure means "signature invalid" and is
    /// reported as `None`, never as an error.
    pub fn public_key(&self, digest: &[u8; 32]) -> Option<PublicKey> {
        let signature = libsecp256k1::Signature::parse_standard_slice(&self.bytes).ok()?;
        let recovery_id = libsecp256k1::RecoveryId::parse(self.recovery_id).ok()?;
        let message = libsecp256k1::Message::parse(digest);
        let recovered = libsecp256k1::recover(&message, &signature, &recovery_id).ok()?;
        Some(PublicKey::from_point(recovered))
    }

    /// Recover the Ethereum address of the signer, binding the signature to
    /// an external wallet identity.
    pub fn ethereum_address(&self, digest: &[u8; 32]) -> Option<Address> {
        Some(self.public_key(digest)?.ethereum_address())
    }
}

/// A secp256k1 curve point plus the optional signature that authenticates it.
///
/// Identity keys are wallet-signed (long-lived anchors); prekeys are signed
/// by an identity key (short-lived session bootstrap keys).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: Vec<u8>,
    pub signature: Option<Signature>,
    pub created_ns: Option<i64>,
}

impl PublicKey {
    /// Build an unsigned public key from SEC1 bytes (compressed or
    /// uncompressed); the stored encoding is normalized to uncompressed.
    pub fn unsigned(bytes: &[u8]) -> Result<Self, CryptoError> {
        let point = libsecp256k1::PublicKey::parse_slice(bytes, None)
            .map_err(|_| CryptoError::InvalidKeyBytes)?;
        Ok(Self::from_point(point))
    }

    pub(crate) fn from_point(point: libsecp256k1::PublicKey) -> Self {
        PublicKey {
            bytes: point.serialize().to_vec(),
            signature: None,
            created_ns: None,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// SHA-256 digest of the curve-point bytes; the message an identity key
    /// signs when it endorses a prekey.
    pub fn signing_digest(&self) -> [u8; 32] {
        Sha256::digest(&self.bytes).into()
    }

    /// Ethereum address of this key: keccak256 of the raw point, last 20
    /// bytes.
    pub fn ethereum_address(&self) -> Address {
        let digest = keccak256(&self.bytes[1..]);
        Address::from_slice(&digest[12..])
    }

    /// Check that this key carries a signature made by `signer` over this
    /// key's signing digest.
    pub fn verify_key_signature(&self, signer: &PublicKey) -> Result<(), CryptoError> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(CryptoError::SignatureMismatch)?;
        let digest = self.signing_digest();
        match signature.public_key(&digest) {
            Some(recovered) if recovered.bytes() == signer.bytes() => Ok(()),
            _ => Err(CryptoError::SignatureMismatch),
        }
    }
}

/// A locally held secp256k1 secret scalar and its derived public key.
///
/// Never serialized in plaintext; the only way a private key leaves the
/// process is inside an encrypted bundle.
#[derive(Clone)]
pub struct PrivateKey {
    secret: libsecp256k1::SecretKey,
    pub public: PublicKey,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Generate a fresh key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        loop {
            let mut bytes = [0u8; SECRET_KEY_LEN];
            OsRng.fill_bytes(&mut bytes);
            // Rejection-sample until the bytes land inside the curve order.
            if let Ok(secret) = libsecp256k1::SecretKey::parse(&bytes) {
                return Self::from_secret(secret);
            }
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SECRET_KEY_LEN {
            return Err(CryptoError::InvalidSecretLength(bytes.len()));
        }
        let mut buf = [0u8; SECRET_KEY_LEN];
        buf.copy_from_slice(bytes);
        let secret = libsecp256k1::SecretKey::parse(&buf)?;
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: libsecp256k1::SecretKey) -> Self {
        let public = PublicKey::from_point(libsecp256k1::PublicKey::from_secret_key(&secret));
        PrivateKey { secret, public }
    }

    pub fn secret_bytes(&self) -> [u8; SECRET_KEY_LEN] {
        self.secret.serialize()
    }

    /// Deterministic (RFC 6979) recoverable ECDSA signature over a 32-byte
    /// digest.
    pub fn sign(&self, digest: &[u8; 32]) -> Signature {
        let message = libsecp256k1::Message::parse(digest);
        let (signature, recovery_id) = libsecp256k1::sign(&message, &self.secret);
        Signature {
            bytes: signature.serialize().to_vec(),
            recovery_id: recovery_id.serialize(),
        }
    }

    /// ECDH against a peer public key; returns the compressed shared point.
    pub fn shared_secret(&self, peer: &PublicKey) -> Result<[u8; 33], CryptoError> {
        let mut point = libsecp256k1::PublicKey::parse_slice(peer.bytes(), None)
            .map_err(|_| CryptoError::InvalidKeyBytes)?;
        point.tweak_mul_assign(&self.secret)?;
        Ok(point.serialize_compressed())
    }
}
