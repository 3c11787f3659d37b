//! User routes. Only the profile read is served locally.

use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::not_implemented;
use crate::middleware::AuthenticatedUser;

/// `GET /api/users/profile`
pub async fn profile(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<Value> {
    Json(json!({ "user": user }))
}

/// `PUT /api/users/profile`
pub async fn update_profile() -> ApiError {
    not_implemented("Update profile")
}

/// `GET /api/users/friends`
pub async fn friends() -> ApiError {
    not_implemented("Get friends")
}

/// `POST /api/users/friends`
pub async fn add_friend() -> ApiError {
    not_implemented("Add friend")
}
