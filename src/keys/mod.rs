//! Signing key custody
//!
//! Envelope encryption of the RSA signing key, its persistence seam, and
//! the custodian service tying the two together.

pub mod custodian;
pub mod envelope;
pub mod store;

pub use custodian::{KeyCustodian, DEFAULT_KEY_ID};
pub use envelope::ServiceSecret;
pub use store::{KeyStore, MemoryKeyStore, MongoKeyStore};
