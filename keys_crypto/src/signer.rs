//! Wallet signer capability.
//!
//! The protocol never asks a wallet for protocol-native signatures; it only
//! needs EIP-191 message signatures it can recover an address from. That
//! keeps the capability small enough that a software key and an external
//! signing device are interchangeable behind [`WalletSigner`].

use alloy::primitives::{eip191_hash_message, Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;

use crate::error::CryptoError;
use crate::keys::Signature;

/// External custodial signer: signs EIP-191 personal messages and reports
/// the wallet address the signatures recover to.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, CryptoError>;

    fn address(&self) -> Address;
}

/// EIP-191 digest of a personal message, as wallets hash before signing.
pub fn personal_digest(message: &[u8]) -> [u8; 32] {
    eip191_hash_message(message).0
}

/// Standard key-holding signer backed by an in-process secp256k1 key.
#[derive(Clone, Debug)]
pub struct LocalWalletSigner {
    signer: PrivateKeySigner,
}

impl LocalWalletSigner {
    pub fn random() -> Self {
        LocalWalletSigner {
            signer: PrivateKeySigner::random(),
        }
    }

    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signer = PrivateKeySigner::from_bytes(&B256::from(bytes))
            .map_err(|e| CryptoError::SignerError(e.to_string()))?;
        Ok(LocalWalletSigner { signer })
    }
}

#[async_trait]
impl WalletSigner for LocalWalletSigner {
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, CryptoError> {
        let signature = self
            .signer
            .sign_message(message)
            .await
            .map_err(|e| CryptoError::SignerError(e.to_string()))?;
        Signature::from_raw(&signature.as_bytes())
    }

    fn address(&self) -> Address {
        self.signer.address()
    }
}

/// Hardware-device-shaped signer: holds the key behind an opaque handle and
/// only answers sign requests, the way a USB wallet would. Signing is
/// deterministic (RFC 6979), so a device and a software signer bound to the
/// same secret produce byte-identical signatures.
pub struct DeviceSigner {
    label: String,
    handle: PrivateKeySigner,
}

impl DeviceSigner {
    pub fn connect(label: &str, secret: [u8; 32]) -> Result<Self, CryptoError> {
        let handle = PrivateKeySigner::from_bytes(&B256::from(secret))
            .map_err(|e| CryptoError::SignerError(e.to_string()))?;
        Ok(DeviceSigner {
            label: label.to_string(),
            handle,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl WalletSigner for DeviceSigner {
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, CryptoError> {
        let signature = self
            .handle
            .sign_message(message)
            .await
            .map_err(|e| CryptoError::SignerError(format!("{}: {e}", self.label)))?;
        Signature::from_raw(&signature.as_bytes())
    }

    fn address(&self) -> Address {
        self.handle.address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::OsRng, RngCore};

    #[tokio::test]
    async fn signature_recovers_to_the_wallet_address() {
        let signer = LocalWalletSigner::random();
        let message = b"de-keys: enable encrypted storage";
        let signature = signer
            .sign_message(message)
            .await
            .expect("failed to sign message");

        let digest = personal_digest(message);
        assert_eq!(signature.ethereum_address(&digest), Some(signer.address()));
    }

    #[tokio::test]
    async fn device_and_local_signer_agree_on_the_same_secret() {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);

        let local = LocalWalletSigner::from_secret_bytes(secret).expect("failed to build signer");
        let device = DeviceSigner::connect("test-device", secret).expect("failed to connect");
        assert_eq!(local.address(), device.address());

        let message = b"identical message";
        let a = local.sign_message(message).await.expect("failed to sign");
        let b = device.sign_message(message).await.expect("failed to sign");
        assert_eq!(a, b);
    }
}
