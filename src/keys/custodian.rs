//! Key custodian
//!
//! Owns the signing keypair lifecycle: existence check, generation,
//! encrypted persistence, and decrypted retrieval. Only the issuing process
//! needs the service secret; verifier processes can fetch the clear public
//! key (or its raw PEM) without any decryption capability.
//!
//! Reads are plain fetches of an immutable-until-replaced record and run
//! concurrently without locking. The single mutation path is
//! [`KeyCustodian::generate_and_store`], an atomic whole-record upsert.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::info;

use super::envelope::{self, ServiceSecret};
use super::store::KeyStore;
use crate::db::schemas::SigningKeyDoc;
use crate::types::{AuthError, Result};

/// The single active key id in the current deployment.
pub const DEFAULT_KEY_ID: &str = "default";

/// RSA modulus size for generated signing keypairs.
pub const RSA_KEY_BITS: usize = 2048;

/// Service object managing the encrypted signing keypair.
pub struct KeyCustodian {
    store: Arc<dyn KeyStore>,
    secret: ServiceSecret,
}

impl KeyCustodian {
    pub fn new(store: Arc<dyn KeyStore>, secret: ServiceSecret) -> Self {
        Self { store, secret }
    }

    /// Whether a key record is persisted under `id`.
    pub async fn exists(&self, id: &str) -> Result<bool> {
        self.store.exists(id).await
    }

    /// Generate a fresh RSA-2048 keypair, seal the private key PEM under
    /// the service secret, and upsert the record.
    ///
    /// An existing record for `id` is replaced wholesale; previously issued
    /// tokens stop verifying once the public key changes.
    pub async fn generate_and_store(&self, id: &str) -> Result<()> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), RSA_KEY_BITS)
            .map_err(|e| AuthError::KeyGeneration(format!("RSA generation failed: {}", e)))?;

        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyGeneration(format!("private key encoding failed: {}", e)))?;
        let public_pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyGeneration(format!("public key encoding failed: {}", e)))?;

        let (ciphertext, nonce) = envelope::seal(&self.secret, private_pem.as_bytes())?;

        let record = SigningKeyDoc::new(
            id,
            BASE64.encode(&ciphertext),
            BASE64.encode(nonce),
            public_pem,
        );
        self.store.upsert(record).await?;

        info!(key_id = %id, bits = RSA_KEY_BITS, "Signing keypair generated and stored");
        Ok(())
    }

    /// Fetch and decrypt the private key for `id`.
    ///
    /// [`AuthError::Decryption`] (wrong secret or tampered record) is kept
    /// distinct from [`AuthError::KeyNotFound`].
    pub async fn load_private_key(&self, id: &str) -> Result<RsaPrivateKey> {
        let record = self.fetch_record(id).await?;

        // A record that fails base64 decoding was tampered with just as
        // surely as one failing the auth tag.
        let ciphertext = BASE64
            .decode(&record.encrypted_private_key)
            .map_err(|_| AuthError::Decryption)?;
        let nonce = BASE64
            .decode(&record.encryption_nonce)
            .map_err(|_| AuthError::Decryption)?;

        let pem = envelope::open(&self.secret, &ciphertext, &nonce)?;
        let pem = std::str::from_utf8(&pem)
            .map_err(|_| AuthError::Internal("stored private key is not valid PEM".into()))?;

        RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|_| AuthError::Internal("stored private key failed to parse".into()))
    }

    /// Fetch and decode the clear-text public key for `id`. Never touches
    /// the cipher or the service secret.
    pub async fn load_public_key(&self, id: &str) -> Result<RsaPublicKey> {
        let record = self.fetch_record(id).await?;
        RsaPublicKey::from_public_key_pem(&record.public_key_pem)
            .map_err(|_| AuthError::Internal("stored public key failed to parse".into()))
    }

    /// Raw public key PEM bytes for external distribution.
    pub async fn public_key_pem(&self, id: &str) -> Result<Vec<u8>> {
        let record = self.fetch_record(id).await?;
        Ok(record.public_key_pem.into_bytes())
    }

    async fn fetch_record(&self, id: &str) -> Result<SigningKeyDoc> {
        self.store
            .fetch(id)
            .await?
            .ok_or_else(|| AuthError::KeyNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::store::MemoryKeyStore;
    use rsa::pkcs8::EncodePublicKey;

    fn custodian(secret: &str) -> (Arc<MemoryKeyStore>, KeyCustodian) {
        let store = Arc::new(MemoryKeyStore::new());
        let custodian = KeyCustodian::new(
            Arc::clone(&store) as Arc<dyn KeyStore>,
            ServiceSecret::from_passphrase(secret),
        );
        (store, custodian)
    }

    #[tokio::test]
    async fn generate_store_load_roundtrip() {
        let (store, custodian) = custodian("s3cr3t");

        custodian.generate_and_store("default").await.unwrap();
        assert!(custodian.exists("default").await.unwrap());
        assert_eq!(store.len(), 1);

        let private = custodian.load_private_key("default").await.unwrap();
        let public = custodian.load_public_key("default").await.unwrap();

        // The stored public half must match the decrypted private key
        assert_eq!(private.to_public_key(), public);

        // And the distributed PEM is the same clear-text key
        let pem = custodian.public_key_pem("default").await.unwrap();
        assert_eq!(
            String::from_utf8(pem).unwrap(),
            public.to_public_key_pem(rsa::pkcs1::LineEnding::LF).unwrap()
        );
    }

    #[tokio::test]
    async fn load_with_wrong_secret_is_decryption_failure() {
        let store = Arc::new(MemoryKeyStore::new());
        let writer = KeyCustodian::new(
            Arc::clone(&store) as Arc<dyn KeyStore>,
            ServiceSecret::from_passphrase("the-real-secret"),
        );
        writer.generate_and_store("default").await.unwrap();

        let reader = KeyCustodian::new(
            Arc::clone(&store) as Arc<dyn KeyStore>,
            ServiceSecret::from_passphrase("some-other-secret"),
        );
        let result = reader.load_private_key("default").await;
        assert!(matches!(result, Err(AuthError::Decryption)));

        // Public key access works without the right secret
        assert!(reader.load_public_key("default").await.is_ok());
    }

    #[tokio::test]
    async fn missing_id_is_not_found_not_decryption() {
        let (_store, custodian) = custodian("s3cr3t");

        assert!(!custodian.exists("default").await.unwrap());
        assert!(matches!(
            custodian.load_private_key("default").await,
            Err(AuthError::KeyNotFound(id)) if id == "default"
        ));
        assert!(matches!(
            custodian.load_public_key("default").await,
            Err(AuthError::KeyNotFound(_))
        ));
        assert!(matches!(
            custodian.public_key_pem("default").await,
            Err(AuthError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn regeneration_replaces_the_record() {
        let (store, custodian) = custodian("s3cr3t");

        custodian.generate_and_store("default").await.unwrap();
        let first_pem = custodian.public_key_pem("default").await.unwrap();

        custodian.generate_and_store("default").await.unwrap();
        let second_pem = custodian.public_key_pem("default").await.unwrap();

        assert_eq!(store.len(), 1);
        assert_ne!(first_pem, second_pem);

        // The replacement record still decrypts to its own public half
        let private = custodian.load_private_key("default").await.unwrap();
        assert_eq!(
            private
                .to_public_key()
                .to_public_key_pem(rsa::pkcs1::LineEnding::LF)
                .unwrap()
                .into_bytes(),
            second_pem
        );
    }
}
