//! Request extractors.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequest, FromRequestParts, Request},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
    Json,
};
use driftway_auth::ClientInfo;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// Field-level checks run after a body deserializes.
pub trait Validate {
    /// Returns the first violated rule as a message.
    fn validate(&self) -> Result<(), String>;
}

/// JSON body that must deserialize and pass [`Validate`], else 400.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            debug!(%rejection, "request body rejected");
            ApiError::Validation("Invalid request data".into())
        })?;

        value.validate().map_err(ApiError::Validation)?;

        Ok(Self(value))
    }
}

/// Client address and user agent of the caller.
#[derive(Debug, Clone)]
pub struct Client(pub ClientInfo);

impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self(client_info(&parts.headers, peer)))
    }
}

/// Resolves the client IP: first `X-Forwarded-For` hop, then `X-Real-IP`,
/// then the socket peer.
pub fn client_info(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientInfo {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let ip = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    ClientInfo::new(ip, user_agent)
}
