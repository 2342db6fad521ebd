//! Basic auth for the HTTP API

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::server::state::ServerState;

/// The only accepted basic auth user name
pub const AUTH_USER: &str = "auth_token";

const REALM: &str = "Basic realm=\"Restricted Area\"";

/// `user:password` from an `Authorization: Basic ...` header
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Reject requests without the configured credentials
pub async fn require_basic_auth(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(token) = &state.auth_token else {
        return next.run(request).await;
    };

    match basic_credentials(request.headers()) {
        Some((user, password)) if user == AUTH_USER && password == token.expose_secret() => {
            next.run(request).await
        }
        _ => {
            debug!("rejecting unauthenticated request to {}", request.uri());
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM))],
                "Not authorized\n",
            )
                .into_response()
        }
    }
}
