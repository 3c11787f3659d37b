//! Bearer token gate.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use driftway_auth::AuthError;
use driftway_storage::User;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// The user resolved from the request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Requires `Authorization: Bearer <token>` resolving to a stored user, and
/// injects [`AuthenticatedUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".into()))?;

    let token = bearer_token(header)
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header format".into()))?;

    let user = state.auth.validate_token(token).await.map_err(|e| {
        if matches!(e, AuthError::InvalidToken(_) | AuthError::UserNotFound) {
            debug!(error = %e, "bearer token rejected");
        }
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(request).await)
}

/// Extracts the token from `Bearer <token>`; anything else is malformed.
fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}
