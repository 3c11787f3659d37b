//! Authenticated pass-through to the backends.

use axum::{
    extract::{Request, State},
    response::Response,
    Extension,
};

use crate::error::ApiResult;
use crate::middleware::AuthenticatedUser;
use crate::proxy::Backend;
use crate::AppState;

/// `ANY /api/text/{*path}`
pub async fn text(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    request: Request,
) -> ApiResult<Response> {
    state
        .proxy
        .forward(Backend::Text, Some(user.id), request)
        .await
}

/// `ANY /api/voice/{*path}`
pub async fn voice(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    request: Request,
) -> ApiResult<Response> {
    state
        .proxy
        .forward(Backend::Voice, Some(user.id), request)
        .await
}
