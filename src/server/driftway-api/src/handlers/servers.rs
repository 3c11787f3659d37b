//! Server (guild) routes. Not served by the gateway yet.

use crate::error::ApiError;
use crate::handlers::not_implemented;

/// `GET /api/servers`
pub async fn list() -> ApiError {
    not_implemented("Get servers")
}

/// `POST /api/servers`
pub async fn create() -> ApiError {
    not_implemented("Create server")
}

/// `GET /api/servers/{id}`
pub async fn get() -> ApiError {
    not_implemented("Get server")
}

/// `PUT /api/servers/{id}`
pub async fn update() -> ApiError {
    not_implemented("Update server")
}

/// `DELETE /api/servers/{id}`
pub async fn delete() -> ApiError {
    not_implemented("Delete server")
}

/// `POST /api/servers/{id}/join`
pub async fn join() -> ApiError {
    not_implemented("Join server")
}

/// `POST /api/servers/{id}/leave`
pub async fn leave() -> ApiError {
    not_implemented("Leave server")
}
