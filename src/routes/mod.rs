//! HTTP route handlers
//!
//! - POST /login         - Check credentials and issue a token
//! - GET  /public-key    - Clear-text verification key PEM
//! - GET  /me            - Identity claims of the presented token
//! - GET  /admin/status  - Service status, admin role only
//! - GET  /health        - Liveness probe
//!
//! Errors leave as `{"error": ..., "code": ...}` JSON; messages never carry
//! key material, ciphertext, or internal paths.

use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::AUTHORIZATION;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::keys::DEFAULT_KEY_ID;
use crate::server::AppState;
use crate::types::AuthError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: String,
    pub greenhouses: Vec<String>,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub username: String,
    pub user_id: String,
    pub role: String,
    pub greenhouses: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub database: String,
    pub key_provisioned: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// POST /login
pub async fn handle_login(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let body = req.into_body().collect().await?.to_bytes();
    let login: LoginRequest = match serde_json::from_slice(&body) {
        Ok(login) => login,
        Err(_) => {
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: "invalid request body".into(),
                    code: "BAD_REQUEST",
                },
            ))
        }
    };

    let user = match state.users.authenticate(&login.username, &login.password).await {
        Ok(user) => user,
        Err(e) => {
            warn!(username = %login.username, "Login rejected");
            return Ok(error_response(&e));
        }
    };

    let user_id = user.id.map(|id| id.to_hex()).unwrap_or_default();
    let greenhouses = match user.id {
        Some(ref id) => match state.users.greenhouses_for(id).await {
            Ok(list) => list,
            Err(e) => return Ok(error_response(&e)),
        },
        None => Vec::new(),
    };

    let token = match state
        .tokens
        .issue(&user.username, &user_id, &user.role, &greenhouses)
        .await
    {
        Ok(token) => token,
        Err(e) => return Ok(error_response(&e)),
    };

    info!(username = %user.username, role = %user.role, "Login succeeded");
    Ok(json_response(
        StatusCode::OK,
        &LoginResponse {
            token,
            username: user.username,
            role: user.role,
            greenhouses,
            expires_at: (Utc::now() + state.tokens.ttl()).timestamp(),
        },
    ))
}

/// GET /public-key
pub async fn handle_public_key(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.custodian.public_key_pem(DEFAULT_KEY_ID).await {
        Ok(pem) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/x-pem-file")
            .header("Cache-Control", "no-store")
            .body(Full::new(Bytes::from(pem)))
            .unwrap(),
        Err(e) => error_response(&e),
    }
}

/// GET /me
pub async fn handle_me(state: Arc<AppState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let ctx = match state.gate.authenticate(authorization_header(&req)).await {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    json_response(
        StatusCode::OK,
        &MeResponse {
            username: ctx.username,
            user_id: ctx.user_id,
            role: ctx.role,
            greenhouses: ctx.greenhouses,
        },
    )
}

/// GET /admin/status
pub async fn handle_admin_status(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    // Authentication failures are 401; a valid token with the wrong role
    // is a 403 from the role check inside authorize.
    let ctx = match state
        .gate
        .authorize(authorization_header(&req), &["admin"])
        .await
    {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&e),
    };

    let key_provisioned = state
        .custodian
        .exists(DEFAULT_KEY_ID)
        .await
        .unwrap_or(false);

    json_response(
        StatusCode::OK,
        &StatusResponse {
            status: "ok",
            database: state.db_name.clone(),
            key_provisioned,
        },
    )
}

/// GET /health
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
}

pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("no route for {}", path),
            code: "NOT_FOUND",
        },
    )
}

/// Map a domain error to its HTTP response.
pub fn error_response(err: &AuthError) -> Response<Full<Bytes>> {
    let status = match err {
        AuthError::InvalidCredentials
        | AuthError::MissingCredentials(_)
        | AuthError::MalformedToken
        | AuthError::AlgorithmRejected(_)
        | AuthError::SignatureInvalid
        | AuthError::Expired
        | AuthError::NotYetValid => StatusCode::UNAUTHORIZED,
        AuthError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
        AuthError::KeyNotFound(_) | AuthError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    json_response(
        status,
        &ErrorResponse {
            error: err.to_string(),
            code: err.code(),
        },
    )
}

fn authorization_header<'r>(req: &'r Request<Incoming>) -> Option<&'r str> {
    req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    // Serialization of our own response types cannot fail
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-store")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
