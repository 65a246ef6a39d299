//! Shared-secret authentication for mutating endpoints

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::error::ApiError;
use super::routes::ApiState;

/// Reject the request unless its Authorization header carries the access token
pub async fn require_token(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    if !is_authorized(request.headers(), &state.config.access_token) {
        debug!("Unauthorized request to {}", request.uri().path());
        state.metrics.inc_unauthorized();
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}

/// The Authorization header must equal the token exactly
pub fn is_authorized(headers: &HeaderMap, token: &str) -> bool {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    !token.is_empty() && value == token
}
