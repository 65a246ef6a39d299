//! API error responses
//!
//! Every failure is returned as `{ "error": "<message>" }` with the matching
//! status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::registry::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input (400)
    #[error("{0}")]
    Validation(String),

    /// Missing or wrong credential (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Duplicate registration (409)
    #[error("{0}")]
    Conflict(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::MissingField(msg) | RegistryError::InvalidFormat(msg) => {
                ApiError::Validation(msg)
            }
            RegistryError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}
