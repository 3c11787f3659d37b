//! Reverse proxy to the text and voice backends.

use std::fmt;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING, UPGRADE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::{ApiError, ApiResult};

/// Identity header set on every authenticated proxied request.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// A proxied backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Text chat service.
    Text,
    /// Voice service.
    Voice,
}

impl Backend {
    fn label(self) -> &'static str {
        match self {
            Backend::Text => "Text service",
            Backend::Voice => "Voice service",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Text => f.write_str("text"),
            Backend::Voice => f.write_str("voice"),
        }
    }
}

/// Health check failure.
#[derive(Debug, Error)]
pub enum HealthError {
    /// The backend could not be reached.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with something other than 200.
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// Reachability of one backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendHealth {
    /// `healthy` or `unhealthy`.
    pub status: &'static str,
    /// Backend URL, when healthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Failure reason, when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate backend reachability. Informational only.
#[derive(Debug, Clone, Serialize)]
pub struct ServicesHealth {
    /// Text backend.
    pub text_service: BackendHealth,
    /// Voice backend.
    pub voice_service: BackendHealth,
}

/// Forwards requests to backends over one shared connection pool.
pub struct ProxyForwarder {
    client: reqwest::Client,
    text_url: String,
    voice_url: String,
    health_timeout: Duration,
    max_body_bytes: usize,
}

impl ProxyForwarder {
    /// Creates a forwarder from gateway configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.proxy_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            text_url: config.text_service_url.trim_end_matches('/').to_string(),
            voice_url: config.voice_service_url.trim_end_matches('/').to_string(),
            health_timeout: config.health_timeout,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Base URL of `backend`, without trailing slash.
    pub fn base_url(&self, backend: Backend) -> &str {
        match backend {
            Backend::Text => &self.text_url,
            Backend::Voice => &self.voice_url,
        }
    }

    /// Forwards `request` to `backend` and streams the answer back.
    ///
    /// The full inbound path and query are appended to the backend base URL.
    /// When `user_id` is set it replaces any client-supplied `X-User-ID`.
    pub async fn forward(
        &self,
        backend: Backend,
        user_id: Option<Uuid>,
        request: Request,
    ) -> ApiResult<Response> {
        let (parts, body) = request.into_parts();
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        if is_websocket_upgrade(&parts.headers) {
            return Err(ApiError::NotImplemented(format!(
                "WebSocket proxy not implemented yet, connect to {}",
                websocket_url(self.base_url(backend), path)
            )));
        }

        let target = format!("{}{}", self.base_url(backend), path);

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| ApiError::Validation(format!("Invalid request body: {e}")))?;

        let mut headers = outbound_headers(&parts.headers);
        if let Some(id) = user_id {
            if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                headers.insert(USER_ID_HEADER, value);
            }
        }
        if !body.is_empty() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        debug!(%backend, method = %parts.method, path, "forwarding request");

        let upstream = self
            .client
            .request(parts.method, &target)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(%backend, error = %e, "backend request failed");
                ApiError::BackendUnavailable(format!("{} unavailable", backend.label()))
            })?;

        let mut response = Response::builder().status(upstream.status());
        if let Some(out) = response.headers_mut() {
            for (name, value) in upstream.headers() {
                if name != CONNECTION && name != TRANSFER_ENCODING {
                    out.append(name.clone(), value.clone());
                }
            }
        }

        response
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|e| ApiError::Internal(format!("response build failed: {e}")))
    }

    /// Issues `GET <base>/health`; only a 200 counts as healthy.
    pub async fn check_health(&self, backend: Backend) -> Result<(), HealthError> {
        let url = format!("{}/health", self.base_url(backend));

        let response = self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            other => Err(HealthError::Status(other)),
        }
    }

    /// Checks both backends concurrently.
    pub async fn health_status(&self) -> ServicesHealth {
        let (text, voice) = tokio::join!(
            self.backend_health(Backend::Text),
            self.backend_health(Backend::Voice)
        );

        ServicesHealth {
            text_service: text,
            voice_service: voice,
        }
    }

    async fn backend_health(&self, backend: Backend) -> BackendHealth {
        match self.check_health(backend).await {
            Ok(()) => BackendHealth {
                status: "healthy",
                url: Some(self.base_url(backend).to_string()),
                error: None,
            },
            Err(e) => BackendHealth {
                status: "unhealthy",
                url: None,
                error: Some(e.to_string()),
            },
        }
    }
}

fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if name == HOST || name == CONTENT_LENGTH || name == TRANSFER_ENCODING || name == USER_ID_HEADER
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

fn websocket_url(base: &str, path: &str) -> String {
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}{path}")
}
