//! Admin authorization.
//!
//! Every admin operation and event ingestion requires the admin key. The
//! check is a plain function so handlers and tests can call it directly;
//! [`require_admin`] runs it before dispatch.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::config::SecurityConfig;
use crate::error::ApiError;

/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "X-API-Key";

/// Checks that the request presents the configured admin key.
///
/// The key is read from `X-API-Key`, or from `Authorization: Bearer <key>`.
pub fn authorize(headers: &HeaderMap, security: &SecurityConfig) -> Result<(), ApiError> {
    let presented = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing admin API key".to_string()))?;

    if security.admin_api_key_hash.is_empty() {
        return Err(ApiError::Forbidden(
            "Admin access is not configured".to_string(),
        ));
    }

    if !shared::crypto::verify_key(presented, &security.admin_api_key_hash) {
        return Err(ApiError::Unauthorized("Invalid admin API key".to_string()));
    }

    Ok(())
}

/// Middleware for admin-only routes.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match authorize(req.headers(), &state.config.security) {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::warn!(path = %req.uri().path(), "Rejected admin request: {}", err);
            err.into_response()
        }
    }
}
