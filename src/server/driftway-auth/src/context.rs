//! Request-side context and auth results.

use serde::Serialize;

use driftway_storage::User;

/// Client details recorded on each issued session.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    /// Client IP address.
    pub ip_address: String,
    /// Client `User-Agent` header.
    pub user_agent: String,
}

impl ClientInfo {
    /// Creates client info from its parts.
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// Result of a successful registration or login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    /// The authenticated user.
    pub user: User,
    /// Bearer token for subsequent calls.
    pub token: String,
}
