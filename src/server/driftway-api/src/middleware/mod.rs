//! Request middleware.
//!
//! Applied outermost first: trace, CORS, rate limit. The bearer-token gate is
//! attached per route group.

pub mod auth;
pub mod cors;
pub mod rate_limit;

pub use auth::{require_auth, AuthenticatedUser};
pub use cors::cors;
pub use rate_limit::rate_limit;
