//! Signing key document schema
//!
//! The persisted form of the service's RSA signing keypair. The private key
//! is stored only as envelope ciphertext plus the nonce it was sealed with;
//! the public key PEM is stored in the clear because it is not secret.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Collection name for signing key records.
pub const KEY_COLLECTION: &str = "keys";

/// Signing key record stored in MongoDB.
///
/// Replaced wholesale on every store: ciphertext, nonce, public key, and
/// timestamps always change together, so a record can never pair a nonce
/// with ciphertext it did not seal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningKeyDoc {
    /// Key identifier (a single well-known id in the current deployment).
    #[serde(rename = "_id")]
    pub id: String,

    /// Base64 ChaCha20-Poly1305 ciphertext of the private key PEM.
    pub encrypted_private_key: String,

    /// Base64 nonce used for that encryption, required to decrypt.
    pub encryption_nonce: String,

    /// PEM-encoded public key, stored in the clear.
    pub public_key_pem: String,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl SigningKeyDoc {
    /// Build a fresh record with both timestamps set to now.
    pub fn new(
        id: impl Into<String>,
        encrypted_private_key: String,
        encryption_nonce: String,
        public_key_pem: String,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: id.into(),
            encrypted_private_key,
            encryption_nonce,
            public_key_pem,
            created_at: now,
            updated_at: now,
        }
    }
}
