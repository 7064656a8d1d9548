//! Shared test fixtures.

use std::sync::{Arc, OnceLock};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::EncodePublicKey;
use rsa::RsaPrivateKey;

use crate::db::schemas::SigningKeyDoc;
use crate::keys::{envelope, KeyCustodian, KeyStore, MemoryKeyStore, ServiceSecret, DEFAULT_KEY_ID};

static RSA_PEM_PAIR: OnceLock<(String, String)> = OnceLock::new();

/// One RSA-2048 keypair shared across the test binary; generation is slow
/// enough in debug builds that each test making its own would dominate the
/// suite's runtime.
pub fn rsa_pem_pair() -> &'static (String, String) {
    RSA_PEM_PAIR.get_or_init(|| {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
            .expect("test keypair generation");
        let private = key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("private key PEM")
            .to_string();
        let public = key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("public key PEM");
        (private, public)
    })
}

/// Memory-backed custodian over an empty store.
pub fn empty_custodian(secret: &str) -> (Arc<MemoryKeyStore>, Arc<KeyCustodian>) {
    let store = Arc::new(MemoryKeyStore::new());
    let custodian = Arc::new(KeyCustodian::new(
        Arc::clone(&store) as Arc<dyn KeyStore>,
        ServiceSecret::from_passphrase(secret),
    ));
    (store, custodian)
}

/// Seal the cached keypair under `secret` and upsert it as the default key
/// record, skipping a fresh RSA generation.
pub async fn seed_cached_key(store: &MemoryKeyStore, secret: &str) {
    let secret = ServiceSecret::from_passphrase(secret);
    let (private_pem, public_pem) = rsa_pem_pair();
    let (ciphertext, nonce) =
        envelope::seal(&secret, private_pem.as_bytes()).expect("seal cached key");

    let record = SigningKeyDoc::new(
        DEFAULT_KEY_ID,
        BASE64.encode(&ciphertext),
        BASE64.encode(nonce),
        public_pem.clone(),
    );
    store.upsert(record).await.expect("seed key record");
}

/// Memory-backed custodian with the cached keypair already provisioned.
pub async fn seeded_custodian(secret: &str) -> (Arc<MemoryKeyStore>, Arc<KeyCustodian>) {
    let (store, custodian) = empty_custodian(secret);
    seed_cached_key(&store, secret).await;
    (store, custodian)
}
