//! API error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use driftway_auth::AuthError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Convenience alias for handler return types.
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-generated failures, each rendered as `{"error": <message>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body or parameters.
    #[error("{0}")]
    Validation(String),

    /// Missing, malformed or rejected bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// Registration conflict.
    #[error("user already exists")]
    AlreadyExists,

    /// Login failure.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Rate budget exhausted.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Proxy target unreachable.
    #[error("{0}")]
    BackendUnavailable(String),

    /// Stubbed route.
    #[error("{0}")]
    NotImplemented(String),

    /// No route matched.
    #[error("not found")]
    NotFound,

    /// Unexpected failure. The detail is logged, never returned.
    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::AlreadyExists => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(error = %detail, "internal error");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::AlreadyExists => ApiError::AlreadyExists,
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::InvalidToken(_) | AuthError::UserNotFound => {
                ApiError::Unauthorized("Invalid token".into())
            }
            AuthError::Storage(msg) | AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}
