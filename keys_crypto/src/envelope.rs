//! Authenticated symmetric envelope: HKDF-SHA256 key derivation into
//! AES-256-GCM.
//!
//! Every call to [`encrypt`] draws a fresh random salt and nonce, so the
//! same secret can protect many payloads without key or nonce reuse. The
//! GCM tag is the sole integrity check on the way back out; any failure is
//! reported as one generic decryption error and never yields partial
//! plaintext.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::CryptoError;

pub const SALT_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
const AES_KEY_LEN: usize = 32;

/// Salt + nonce + sealed payload. The salt feeds HKDF, the nonce feeds GCM.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    pub payload: Vec<u8>,
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
}

fn derive_key(secret: &[u8], salt: &[u8]) -> Result<[u8; AES_KEY_LEN], CryptoError> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), secret);
    let mut key = [0u8; AES_KEY_LEN];
    hkdf.expand(&[], &mut key)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    Ok(key)
}

/// Seal `plaintext` under `secret`. Optional AAD is bound into the GCM tag.
pub fn encrypt(
    plaintext: &[u8],
    secret: &[u8],
    aad: Option<&[u8]>,
) -> Result<Ciphertext, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(secret, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::EncryptionFailed)?;
    let payload = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: aad.unwrap_or_default(),
            },
        )
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(Ciphertext {
        payload,
        salt: salt.to_vec(),
        nonce: nonce.to_vec(),
    })
}

/// Open a [`Ciphertext`] with the secret it was sealed under. Fails closed
/// on any mismatch: wrong lengths, wrong key, wrong AAD, or a flipped bit
/// anywhere in the payload.
pub fn decrypt(
    ciphertext: &Ciphertext,
    secret: &[u8],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.salt.len() != SALT_LEN || ciphertext.nonce.len() != NONCE_LEN {
        return Err(CryptoError::DecryptionFailed);
    }

    let key = derive_key(secret, &ciphertext.salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::DecryptionFailed)?;
    cipher
        .decrypt(
            Nonce::from_slice(&ciphertext.nonce),
            Payload {
                msg: &ciphertext.payload,
                aad: aad.unwrap_or_default(),
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed)
}
