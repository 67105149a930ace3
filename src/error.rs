use ds::PersistenceError;
use keys_crypto::{BundleError, CryptoError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    PersistenceError(#[from] PersistenceError),

    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum KeyManagerError {
    #[error(transparent)]
    CryptoError(#[from] CryptoError),
    #[error(transparent)]
    BundleError(#[from] BundleError),
    #[error(transparent)]
    PersistenceError(#[from] PersistenceError),

    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("An unknown error occurred: {0}")]
    Other(anyhow::Error),
}

impl KeyManagerError {
    /// Integrity failures indicate tampering or a wrong key and must never
    /// be retried; absence and transport hiccups are the retryable cases.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            KeyManagerError::CryptoError(
                CryptoError::MacMismatch
                    | CryptoError::SignatureMismatch
                    | CryptoError::DecryptionFailed
            ) | KeyManagerError::PersistenceError(PersistenceError::Crypto(
                CryptoError::MacMismatch
                    | CryptoError::SignatureMismatch
                    | CryptoError::DecryptionFailed
            ))
        )
    }
}
