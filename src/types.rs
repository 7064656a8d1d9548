//! Error types for plantcare-auth
//!
//! Every failure the service can surface is a variant here, so callers
//! branch on kind rather than matching message strings. Messages stay
//! non-leaky: no key material, ciphertext, or internal paths.

use thiserror::Error;

/// Failure taxonomy for key custody, token handling, and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No signing key record persisted under the given id.
    #[error("signing key '{0}' not found")]
    KeyNotFound(String),

    /// Authentication tag mismatch opening the private-key ciphertext:
    /// wrong service secret or a tampered record. Deliberately distinct
    /// from [`AuthError::KeyNotFound`].
    #[error("signing key decryption failed")]
    Decryption,

    /// Keypair generation or persistence failed while creating a record.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Token is structurally unparseable (or the bearer header is missing
    /// or malformed).
    #[error("malformed bearer token")]
    MalformedToken,

    /// Token header declares an algorithm outside the RSA signing family.
    /// Checked before any signature computation.
    #[error("token algorithm '{0}' rejected")]
    AlgorithmRejected(String),

    /// Signature does not verify against the active public key.
    #[error("token signature invalid")]
    SignatureInvalid,

    /// Token expiry has passed.
    #[error("token expired")]
    Expired,

    /// Token not-before time is still in the future.
    #[error("token not yet valid")]
    NotYetValid,

    /// No usable Authorization header on the request: absent, wrong
    /// scheme, or not exactly `Bearer <token>`.
    #[error("{0}")]
    MissingCredentials(String),

    /// Token verified, but the caller's role is not in the allow-list.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Unknown user or wrong password. Uniform on purpose.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Persistence backend failure (unreachable, timed out, rejected).
    #[error("database error: {0}")]
    Database(String),

    /// Request marshalling problems at the HTTP boundary.
    #[error("http error: {0}")]
    Http(String),

    /// Bugs and should-not-happen conditions.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::KeyNotFound(_) => "KEY_NOT_FOUND",
            AuthError::Decryption => "KEY_DECRYPTION_FAILED",
            AuthError::KeyGeneration(_) => "KEY_GENERATION_FAILED",
            AuthError::MalformedToken => "MALFORMED_TOKEN",
            AuthError::AlgorithmRejected(_) => "ALGORITHM_REJECTED",
            AuthError::SignatureInvalid => "SIGNATURE_INVALID",
            AuthError::Expired => "TOKEN_EXPIRED",
            AuthError::NotYetValid => "TOKEN_NOT_YET_VALID",
            AuthError::MissingCredentials(_) => "MISSING_CREDENTIALS",
            AuthError::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::Database(_) => "DATABASE_ERROR",
            AuthError::Http(_) => "BAD_REQUEST",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuthError>;
