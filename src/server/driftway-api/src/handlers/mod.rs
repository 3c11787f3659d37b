//! Route handlers.

pub mod auth;
pub mod health;
pub mod proxy;
pub mod servers;
pub mod users;

use crate::error::ApiError;

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub(crate) fn not_implemented(feature: &str) -> ApiError {
    ApiError::NotImplemented(format!("{feature} not implemented yet"))
}
