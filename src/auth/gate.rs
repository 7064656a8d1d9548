//! Request authorization gate
//!
//! Pulls the bearer token out of the Authorization header, verifies it,
//! and checks the caller's role against a per-route allow-list. Header
//! parsing is strict: exactly two space-separated parts with a
//! case-sensitive `Bearer` scheme.
//!
//! Failure kinds stay distinct so the HTTP layer can branch on variant:
//! [`AuthError::MissingCredentials`] for a missing or malformed header,
//! token errors from verification, and [`AuthError::AuthorizationDenied`]
//! only for a verified caller whose role is not allowed.

use std::sync::Arc;

use super::jwt::{Claims, TokenService};
use crate::types::{AuthError, Result};

/// Identity established for an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub username: String,
    pub user_id: String,
    pub role: String,
    pub greenhouses: Vec<String>,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.username,
            user_id: claims.user_id,
            role: claims.role,
            greenhouses: claims.greenhouses,
        }
    }
}

/// Extract the token from an Authorization header value.
///
/// `"Bearer <token>"` and nothing else: a missing header, a different
/// scheme, a lowercase `bearer`, or extra parts all fail with
/// [`AuthError::MissingCredentials`].
pub fn extract_bearer_token(authorization: Option<&str>) -> Result<&str> {
    let value = authorization
        .ok_or_else(|| AuthError::MissingCredentials("authorization header required".into()))?;

    let parts: Vec<&str> = value.split(' ').collect();
    if parts.len() != 2 || parts[0] != "Bearer" {
        return Err(AuthError::MissingCredentials(
            "invalid authorization header format".into(),
        ));
    }
    Ok(parts[1])
}

/// Role allow-list check for an already-authenticated caller.
pub fn require_role(ctx: &AuthContext, allowed_roles: &[&str]) -> Result<()> {
    if allowed_roles.contains(&ctx.role.as_str()) {
        Ok(())
    } else {
        Err(AuthError::AuthorizationDenied(
            "insufficient permissions".into(),
        ))
    }
}

/// Verifies bearer tokens and enforces role allow-lists.
pub struct AuthGate {
    tokens: Arc<TokenService>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    /// Establish the caller's identity from the Authorization header.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<AuthContext> {
        let token = extract_bearer_token(authorization)?;
        let claims = self.tokens.verify(token).await?;
        Ok(claims.into())
    }

    /// Authenticate and require one of `allowed_roles`.
    pub async fn authorize(
        &self,
        authorization: Option<&str>,
        allowed_roles: &[&str],
    ) -> Result<AuthContext> {
        let ctx = self.authenticate(authorization).await?;
        require_role(&ctx, allowed_roles)?;
        Ok(ctx)
    }
}
