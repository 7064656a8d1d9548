//! Database schemas
//!
//! MongoDB document structures for signing keys, users, and greenhouse
//! access grants.

mod signing_key;
mod user;

pub use signing_key::{SigningKeyDoc, KEY_COLLECTION};
pub use user::{GreenhouseAccessDoc, UserDoc, GREENHOUSE_ACCESS_COLLECTION, USER_COLLECTION};
