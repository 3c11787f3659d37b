//! # Driftway API
//!
//! HTTP layer of the Driftway gateway.
//!
//! ## Endpoints
//!
//! - `/health`, `/health/services` - Liveness and backend status
//! - `/api/auth/*` - Registration, login and identity
//! - `/api/text/*`, `/api/voice/*` - Authenticated reverse proxy
//! - `/api/users/*`, `/api/servers/*` - Authenticated, mostly not implemented

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod rate_limit;

use std::sync::Arc;

use axum::routing::{any, get, post};
use axum::Router;
use driftway_auth::AuthService;
use tower_http::trace::TraceLayer;

pub use config::GatewayConfig;
pub use error::{ApiError, ApiResult};
pub use proxy::{Backend, ProxyForwarder};
pub use rate_limit::RateLimiter;

use crate::handlers::{auth, health, proxy as proxy_handlers, servers, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credential issuance and validation.
    pub auth: Arc<AuthService>,
    /// Process-wide rate budget.
    pub limiter: Arc<RateLimiter>,
    /// Backend forwarder.
    pub proxy: Arc<ProxyForwarder>,
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Builds the state for `config`, creating the limiter and connection pool.
    pub fn new(config: GatewayConfig, auth: AuthService) -> Result<Self, ApiError> {
        let proxy = ProxyForwarder::new(&config)
            .map_err(|e| ApiError::Internal(format!("failed to build HTTP client: {e}")))?;
        let limiter = RateLimiter::new(config.rate_limit_requests, config.rate_limit_window);

        Ok(Self {
            auth: Arc::new(auth),
            limiter: Arc::new(limiter),
            proxy: Arc::new(proxy),
            config: Arc::new(config),
        })
    }
}

/// Builds the router with all routes, middleware and shared state.
pub fn router(state: AppState) -> Router {
    let require_auth =
        axum::middleware::from_fn_with_state(state.clone(), middleware::require_auth);

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/health/services", get(health::services))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh));

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/text/{*path}", any(proxy_handlers::text))
        .route("/api/voice/{*path}", any(proxy_handlers::voice))
        .route(
            "/api/users/profile",
            get(users::profile).put(users::update_profile),
        )
        .route(
            "/api/users/friends",
            get(users::friends).post(users::add_friend),
        )
        .route("/api/servers", get(servers::list).post(servers::create))
        .route(
            "/api/servers/{id}",
            get(servers::get)
                .put(servers::update)
                .delete(servers::delete),
        )
        .route("/api/servers/{id}/join", post(servers::join))
        .route("/api/servers/{id}/leave", post(servers::leave))
        .route_layer(require_auth);

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::middleware::from_fn(middleware::cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
