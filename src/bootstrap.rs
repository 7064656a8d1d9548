//! Startup key provisioning
//!
//! Ensures a signing key exists before the service starts issuing tokens.
//! The failure policy is asymmetric: if the key is confirmed absent and
//! cannot be generated the service must not start, but a failed existence
//! check alone is survivable since the key most likely still sits in the
//! store from an earlier run.

use tracing::{info, warn};

use crate::keys::KeyCustodian;
use crate::types::Result;

/// Generate and store a signing key under `id` unless one already exists.
pub async fn ensure_signing_key(custodian: &KeyCustodian, id: &str) -> Result<()> {
    match custodian.exists(id).await {
        Ok(true) => {
            info!(key_id = %id, "Signing key already provisioned");
            Ok(())
        }
        Ok(false) => {
            info!(key_id = %id, "No signing key found, generating");
            custodian.generate_and_store(id).await
        }
        Err(e) => {
            warn!(key_id = %id, error = %e, "Signing key existence check failed, continuing");
            Ok(())
        }
    }
}
