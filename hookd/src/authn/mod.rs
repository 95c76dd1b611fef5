//! Request authentication

pub mod signature;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::ExposeSecret;
use tracing::warn;

use crate::server::handlers::ErrorResponse;
use crate::server::state::ServerState;

/// Upper bound on a buffered webhook body
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Routing-layer guard for state-mutating and information-disclosing
/// operations. Buffers the raw body, verifies its signature against the
/// shared secret, and only then lets the request through.
pub async fn require_signature(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return error_response(StatusCode::BAD_REQUEST, "Unreadable body");
        }
    };

    let header = parts
        .headers
        .get(signature::SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let Some(header) = header else {
        warn!("No signature provided");
        return error_response(StatusCode::UNAUTHORIZED, "No signature");
    };

    if signature::verify_signature(state.secret.expose_secret(), &bytes, header).is_err() {
        warn!("Invalid signature");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid signature");
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
