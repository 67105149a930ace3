#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to publish to topic {topic}: {reason}")]
    PublishFailed { topic: String, reason: String },
    #[error("Failed to query topic {topic}: {reason}")]
    QueryFailed { topic: String, reason: String },

    #[error("An unknown error occurred: {0}")]
    Other(anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] keys_crypto::CryptoError),
    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),
}
