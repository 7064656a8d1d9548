//! HTTP server
//!
//! hyper http1 with TokioIo, one spawned task per connection. Routing is a
//! match on (method, path); handlers live in [`crate::routes`].

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::auth::{AuthGate, TokenService};
use crate::config::Args;
use crate::keys::KeyCustodian;
use crate::routes;
use crate::types::{AuthError, Result};
use crate::users::UserStore;

/// Shared application state.
///
/// The token service and gate read keys through the custodian per call, so
/// a store that recovers after startup (or a key replaced by another
/// replica) takes effect without a restart.
pub struct AppState {
    pub args: Args,
    pub db_name: String,
    pub users: Arc<UserStore>,
    pub custodian: Arc<KeyCustodian>,
    pub tokens: Arc<TokenService>,
    pub gate: AuthGate,
}

/// Start the HTTP server.
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| AuthError::Http(format!("bind {} failed: {}", state.args.listen, e)))?;

    info!("Auth service listening on {}", state.args.listen);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests.
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/health") => routes::handle_health(),
        (&Method::POST, "/login") => routes::handle_login(state, req).await?,
        (&Method::GET, "/public-key") => routes::handle_public_key(state).await,
        (&Method::GET, "/me") => routes::handle_me(state, req).await,
        (&Method::GET, "/admin/status") => routes::handle_admin_status(state, req).await,
        (&Method::OPTIONS, _) => preflight_response(),
        _ => routes::not_found_response(&path),
    };

    Ok(response)
}

/// CORS preflight response.
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}
