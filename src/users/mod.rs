//! User accounts and greenhouse grants
//!
//! MongoDB-backed user store: credential checks, first-run seeding, and
//! the greenhouse grant lookup whose result gets embedded in tokens.

use bson::{doc, oid::ObjectId};
use futures_util::TryStreamExt;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};
use tracing::{info, warn};

use crate::auth::password;
use crate::db::schemas::{
    GreenhouseAccessDoc, UserDoc, GREENHOUSE_ACCESS_COLLECTION, USER_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::{AuthError, Result};

/// Accounts created on first run so a fresh deployment is usable.
const DEFAULT_USERS: [(&str, &str, &str); 2] =
    [("admin", "admin123", "admin"), ("user", "user123", "user")];

pub struct UserStore {
    users: Collection<UserDoc>,
    access: Collection<GreenhouseAccessDoc>,
}

impl UserStore {
    pub fn new(mongo: &MongoClient) -> Self {
        Self {
            users: mongo.collection(USER_COLLECTION),
            access: mongo.collection(GREENHOUSE_ACCESS_COLLECTION),
        }
    }

    /// Create the unique username index. Safe to call on every startup;
    /// MongoDB treats an existing identical index as a no-op.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users
            .create_index(index)
            .await
            .map_err(|e| AuthError::Database(format!("index creation failed: {}", e)))?;
        Ok(())
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserDoc>> {
        self.users
            .find_one(doc! { "username": username })
            .await
            .map_err(|e| AuthError::Database(format!("user lookup failed: {}", e)))
    }

    /// Hash the password and insert a new user. Fails if the username is
    /// already taken.
    pub async fn create_user(&self, username: &str, password: &str, role: &str) -> Result<UserDoc> {
        if self.find_by_username(username).await?.is_some() {
            return Err(AuthError::Database(format!(
                "username '{}' already exists",
                username
            )));
        }

        let mut user = UserDoc::new(username, password::hash_password(password)?, role);
        let inserted = self
            .users
            .insert_one(&user)
            .await
            .map_err(|e| AuthError::Database(format!("user insert failed: {}", e)))?;
        user.id = inserted.inserted_id.as_object_id();

        info!(username = %username, role = %role, "User created");
        Ok(user)
    }

    /// Check credentials. Unknown username and wrong password both come
    /// back as [`AuthError::InvalidCredentials`] so the response does not
    /// reveal which half failed.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserDoc> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if password::verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Greenhouse ids this user has been granted access to.
    pub async fn greenhouses_for(&self, user_id: &ObjectId) -> Result<Vec<String>> {
        let mut cursor = self
            .access
            .find(doc! { "userId": user_id })
            .await
            .map_err(|e| AuthError::Database(format!("access lookup failed: {}", e)))?;

        let mut greenhouses = Vec::new();
        while let Some(grant) = cursor
            .try_next()
            .await
            .map_err(|e| AuthError::Database(format!("access cursor failed: {}", e)))?
        {
            greenhouses.push(grant.greenhouse_id);
        }
        Ok(greenhouses)
    }

    /// Create the default accounts if they are missing. Existing accounts
    /// are left untouched, so re-running is safe.
    pub async fn seed_default_users(&self) -> Result<()> {
        for (username, password, role) in DEFAULT_USERS {
            if self.find_by_username(username).await?.is_some() {
                continue;
            }
            match self.create_user(username, password, role).await {
                Ok(_) => warn!(
                    username = %username,
                    "Seeded default account with a well-known password; change it"
                ),
                // A replica may have seeded the same account concurrently
                Err(e) => warn!(username = %username, error = %e, "Default account seeding skipped"),
            }
        }
        Ok(())
    }
}
