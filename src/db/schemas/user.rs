//! User and greenhouse-access document schemas

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Collection name for users.
pub const USER_COLLECTION: &str = "users";

/// Collection name for user-to-greenhouse access grants.
pub const GREENHOUSE_ACCESS_COLLECTION: &str = "greenhouse_access";

/// User document stored in MongoDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub username: String,

    /// Argon2 password hash (PHC string). Never serialized to clients.
    pub password_hash: String,

    /// Role name used by the authorization gate ("admin", "user", ...).
    pub role: String,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl UserDoc {
    pub fn new(username: impl Into<String>, password_hash: String, role: impl Into<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            username: username.into(),
            password_hash,
            role: role.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Grant giving a user access to one greenhouse.
///
/// The greenhouse ids collected from these grants are embedded in issued
/// tokens; they are not re-checked per request while a token is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreenhouseAccessDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub user_id: ObjectId,
    pub greenhouse_id: String,
    pub access_level: String,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}
