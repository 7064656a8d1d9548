//! Authentication and authorization
//!
//! Token issuance/verification, the request authorization gate, and
//! password hashing.

pub mod gate;
pub mod jwt;
pub mod password;

pub use gate::{extract_bearer_token, require_role, AuthContext, AuthGate};
pub use jwt::{Claims, TokenService, TOKEN_ISSUER};
