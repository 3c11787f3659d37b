//! Registration, login and identity handlers.

use axum::{extract::State, http::StatusCode, Extension, Json};
use driftway_auth::AuthResponse;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::extract::{Client, JsonBody, Validate};
use crate::handlers::not_implemented;
use crate::middleware::AuthenticatedUser;
use crate::AppState;

/// Registration body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// 3 to 50 characters.
    pub username: String,
    /// Well-formed address.
    pub email: String,
    /// At least 6 characters.
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        let len = self.username.chars().count();
        if !(3..=50).contains(&len) {
            return Err("username must be between 3 and 50 characters".into());
        }
        if !is_valid_email(&self.email) {
            return Err("email is invalid".into());
        }
        if self.password.chars().count() < 6 {
            return Err("password must be at least 6 characters".into());
        }
        Ok(())
    }
}

/// Login body. `username` may also be an email address.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() {
            return Err("username is required".into());
        }
        if self.password.is_empty() {
            return Err("password is required".into());
        }
        Ok(())
    }
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    Client(client): Client,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let resp = state
        .auth
        .register(&body.username, &body.email, &body.password, &client)
        .await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Client(client): Client,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let resp = state
        .auth
        .login(&body.username, &body.password, &client)
        .await?;
    Ok(Json(resp))
}

/// `POST /api/auth/refresh`
pub async fn refresh() -> ApiError {
    not_implemented("Token refresh")
}

/// `GET /api/auth/me`
pub async fn me(Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>) -> Json<Value> {
    Json(json!({ "user": user }))
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
