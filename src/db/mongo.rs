//! MongoDB client wrapper
//!
//! Connection bootstrap with short timeouts so a stalled backend surfaces
//! as an error the caller can retry rather than an indefinite hang.

use bson::doc;
use mongodb::{Client, Collection};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::types::AuthError;

/// MongoDB client wrapper holding the database handle.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping the database.
    ///
    /// Server selection and connect timeouts are capped at 3 seconds so an
    /// unreachable backend fails fast; per-operation calls inherit the same
    /// server-selection bound.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, AuthError> {
        info!("Connecting to MongoDB at {}", uri);

        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| AuthError::Database(format!("failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AuthError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection handle.
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        self.client.database(&self.db_name).collection::<T>(name)
    }

    /// Database name this client is bound to.
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}
