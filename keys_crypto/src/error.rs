#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),
    #[error("Invalid recovery bit: {0}")]
    InvalidRecoveryBit(u8),
    #[error("Invalid public key bytes")]
    InvalidKeyBytes,
    #[error("Invalid secret key length: expected 32 bytes, got {0}")]
    InvalidSecretLength(usize),

    #[error("MAC mismatch on ECIES ciphertext")]
    MacMismatch,
    #[error("Owner signature mismatch on ECIES ciphertext")]
    SignatureMismatch,
    #[error("Failed to encrypt payload")]
    EncryptionFailed,
    #[error("Failed to decrypt payload")]
    DecryptionFailed,

    #[error("Secp256k1 error: {0}")]
    Secp(#[from] libsecp256k1::Error),
    #[error("Signer error: {0}")]
    SignerError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Bundle is missing the identity key")]
    MissingIdentityKey,
    #[error("Bundle is missing the pre key")]
    MissingPreKey,
    #[error("Identity key is not signed")]
    UnsignedIdentityKey,
    #[error("Pre key is not signed")]
    UnsignedPreKey,
    #[error("Pre key signature does not match the identity key")]
    PreKeySignatureInvalid,

    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error(transparent)]
    CryptoError(#[from] CryptoError),
}
