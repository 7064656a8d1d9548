//! Key record persistence backends
//!
//! The custodian only needs three operations against its backing store, so
//! they live behind a trait: MongoDB in deployment, an in-memory map for
//! tests and non-persistent runs. A file-backed store would plug in at the
//! same seam.

use async_trait::async_trait;
use bson::doc;
use dashmap::DashMap;
use mongodb::Collection;

use crate::db::schemas::{SigningKeyDoc, KEY_COLLECTION};
use crate::db::MongoClient;
use crate::types::{AuthError, Result};

/// Storage seam for signing key records.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fetch the record for `id`, if one is persisted.
    async fn fetch(&self, id: &str) -> Result<Option<SigningKeyDoc>>;

    /// Replace the record for the document's id wholesale, creating it if
    /// absent. Must be atomic: concurrent upserts for the same id may race,
    /// but a reader never observes a nonce paired with foreign ciphertext.
    async fn upsert(&self, record: SigningKeyDoc) -> Result<()>;

    /// Whether a record exists for `id`. Side-effect-free.
    async fn exists(&self, id: &str) -> Result<bool>;
}

/// MongoDB-backed key store.
pub struct MongoKeyStore {
    collection: Collection<SigningKeyDoc>,
}

impl MongoKeyStore {
    pub fn new(mongo: &MongoClient) -> Self {
        Self {
            collection: mongo.collection(KEY_COLLECTION),
        }
    }
}

#[async_trait]
impl KeyStore for MongoKeyStore {
    async fn fetch(&self, id: &str) -> Result<Option<SigningKeyDoc>> {
        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| AuthError::Database(format!("key fetch failed: {}", e)))
    }

    async fn upsert(&self, record: SigningKeyDoc) -> Result<()> {
        // replace_one with upsert gives the whole-record atomic swap;
        // last writer wins on a bootstrap race between replicas.
        self.collection
            .replace_one(doc! { "_id": &record.id }, &record)
            .upsert(true)
            .await
            .map_err(|e| AuthError::Database(format!("key upsert failed: {}", e)))?;
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let count = self
            .collection
            .count_documents(doc! { "_id": id })
            .await
            .map_err(|e| AuthError::Database(format!("key existence check failed: {}", e)))?;
        Ok(count > 0)
    }
}

/// In-memory key store for tests and non-persistent runs.
#[derive(Default)]
pub struct MemoryKeyStore {
    records: DashMap<String, SigningKeyDoc>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held (test observability).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn fetch(&self, id: &str) -> Result<Option<SigningKeyDoc>> {
        Ok(self.records.get(id).map(|r| r.clone()))
    }

    async fn upsert(&self, record: SigningKeyDoc) -> Result<()> {
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.records.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_replaces_wholesale() {
        let store = MemoryKeyStore::new();
        assert!(!store.exists("default").await.unwrap());

        store
            .upsert(SigningKeyDoc::new("default", "ct-1".into(), "n-1".into(), "pub-1".into()))
            .await
            .unwrap();
        store
            .upsert(SigningKeyDoc::new("default", "ct-2".into(), "n-2".into(), "pub-2".into()))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let record = store.fetch("default").await.unwrap().unwrap();
        assert_eq!(record.encrypted_private_key, "ct-2");
        assert_eq!(record.encryption_nonce, "n-2");
        assert_eq!(record.public_key_pem, "pub-2");
    }

    #[tokio::test]
    async fn memory_store_fetch_missing_is_none() {
        let store = MemoryKeyStore::new();
        assert!(store.fetch("nope").await.unwrap().is_none());
    }
}
