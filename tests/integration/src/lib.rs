//! End-to-end tests for the Driftway gateway.
//!
//! Each test serves a gateway and echo backends on ephemeral local ports and
//! talks to them over real HTTP.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use driftway_api::{AppState, GatewayConfig};
use driftway_auth::{AuthService, PasswordHasher};
use driftway_storage::CredentialStore;
use driftway_token::TokenCodec;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Signing secret shared by every test gateway.
pub const TEST_SECRET: &[u8] = b"integration-test-secret-minimum-32";

/// Size of the payload served by the echo backend's `/large` route.
pub const LARGE_BODY_LEN: usize = 1024 * 1024;

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// What an echo backend saw.
#[derive(Debug, Deserialize)]
pub struct EchoedRequest {
    pub backend: String,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl EchoedRequest {
    /// All received values of `name` (lowercase).
    pub fn header(&self, name: &str) -> &[String] {
        self.headers.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

// ============================================================================
// Echo Backend
// ============================================================================

#[derive(Clone)]
struct BackendState {
    label: &'static str,
    hits: Arc<AtomicUsize>,
}

/// A backend that describes every request it receives.
pub struct EchoBackend {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl EchoBackend {
    /// Serves an echo backend on an ephemeral port.
    pub async fn start(label: &'static str) -> Result<Self> {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = BackendState {
            label,
            hits: hits.clone(),
        };

        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/api/{service}/blob", get(blob))
            .route("/api/{service}/large", get(large))
            .fallback(echo)
            .with_state(state);

        let (base_url, task) = serve(app).await?;

        Ok(Self {
            base_url,
            hits,
            task,
        })
    }

    /// Requests received, excluding health checks.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for EchoBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn echo(
    State(state): State<BackendState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(value.to_str().unwrap_or_default().to_string());
    }

    let status = headers
        .get("x-echo-status")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u16>().ok())
        .and_then(|v| StatusCode::from_u16(v).ok())
        .unwrap_or(StatusCode::OK);

    let described = json!({
        "backend": state.label,
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": seen,
        "body": String::from_utf8_lossy(&body),
    });

    (status, [("x-backend", state.label)], Json(described)).into_response()
}

/// Fixed binary payload with unusual status and repeated headers.
async fn blob(State(state): State<BackendState>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let body: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let mut response = (StatusCode::CREATED, body).into_response();
    let headers = response.headers_mut();
    headers.insert("content-type", "application/octet-stream".parse().unwrap());
    headers.insert("x-backend-version", "7".parse().unwrap());
    headers.insert(
        "access-control-allow-origin",
        "https://app.example".parse().unwrap(),
    );
    headers.append("set-cookie", "a=1".parse().unwrap());
    headers.append("set-cookie", "b=2".parse().unwrap());
    response
}

async fn large(State(state): State<BackendState>) -> Vec<u8> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    large_body()
}

/// The exact bytes the `/large` route serves.
pub fn large_body() -> Vec<u8> {
    (0..LARGE_BODY_LEN).map(|i| (i % 251) as u8).collect()
}

// ============================================================================
// Test Gateway
// ============================================================================

/// A gateway served in-process.
pub struct TestGateway {
    pub base_url: String,
    task: JoinHandle<()>,
}

impl TestGateway {
    /// Serves a gateway in front of the given backends.
    pub async fn start(
        store: Arc<dyn CredentialStore>,
        text_url: &str,
        voice_url: &str,
        rate_limit_requests: u32,
    ) -> Result<Self> {
        let auth = AuthService::new(store, TokenCodec::new(TEST_SECRET))
            .with_hasher(PasswordHasher::minimal());
        let config = GatewayConfig {
            text_service_url: text_url.to_string(),
            voice_service_url: voice_url.to_string(),
            rate_limit_requests,
            rate_limit_window: Duration::from_secs(3600),
            health_timeout: Duration::from_secs(2),
            ..GatewayConfig::default()
        };

        let state = AppState::new(config, auth).context("Failed to build gateway state")?;
        let (base_url, task) = serve(driftway_api::router(state)).await?;

        Ok(Self { base_url, task })
    }

    /// A client for this gateway.
    pub fn client(&self) -> GatewayClient {
        GatewayClient::new(&self.base_url)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(app: Router) -> Result<(String, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind ephemeral port")?;
    let addr = listener.local_addr()?;

    let task = tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
    });

    Ok((format!("http://{addr}"), task))
}

// ============================================================================
// Test Client
// ============================================================================

/// HTTP client for testing the gateway API.
pub struct GatewayClient {
    /// Underlying HTTP client, for direct backend calls.
    pub client: Client,
    base_url: String,
    token: Option<String>,
}

impl GatewayClient {
    /// Creates an unauthenticated client for `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.to_string(),
            token: None,
        }
    }

    /// Attaches a bearer token to later requests.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Absolute URL for a gateway path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A request builder carrying the bearer token, if any.
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Registers `username` with a derived email address.
    pub async fn register(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let email = format!("{username}@example.com");
        let req = RegisterRequest {
            username,
            email: &email,
            password,
        };
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&req)
            .send()
            .await?;
        if resp.status() != StatusCode::CREATED {
            bail!("Register failed: {}", resp.text().await?);
        }
        Ok(resp.json().await?)
    }

    /// Signs in by username.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let req = LoginRequest { username, password };
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("Login failed: {}", resp.text().await?);
        }
        Ok(resp.json().await?)
    }

    /// Fetches the authenticated user.
    pub async fn me(&self) -> Result<Value> {
        let resp = self.request(Method::GET, "/api/auth/me").send().await?;
        if !resp.status().is_success() {
            bail!("Me failed: {}", resp.text().await?);
        }
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftway_storage::MemoryStore;
    use driftway_storage_sqlite::SqliteStore;
    use tempfile::TempDir;

    struct Stack {
        gateway: TestGateway,
        text: EchoBackend,
        voice: EchoBackend,
    }

    async fn stack(rate_limit_requests: u32) -> Stack {
        let text = EchoBackend::start("text").await.unwrap();
        let voice = EchoBackend::start("voice").await.unwrap();
        let gateway = TestGateway::start(
            Arc::new(MemoryStore::new()),
            &text.base_url,
            &voice.base_url,
            rate_limit_requests,
        )
        .await
        .unwrap();

        Stack {
            gateway,
            text,
            voice,
        }
    }

    async fn signed_in(stack: &Stack, username: &str) -> (GatewayClient, AuthResponse) {
        let auth = stack
            .gateway
            .client()
            .register(username, "hunter22")
            .await
            .unwrap();
        let client = stack.gateway.client().with_token(&auth.token);
        (client, auth)
    }

    #[tokio::test]
    async fn test_register_login_me_over_http() {
        let stack = stack(100).await;
        let anonymous = stack.gateway.client();

        let registered = anonymous.register("alice", "hunter22").await.unwrap();
        let logged_in = anonymous.login("alice", "hunter22").await.unwrap();

        assert_eq!(registered.user.id, logged_in.user.id);
        assert_eq!(logged_in.user.email, "alice@example.com");

        let me = anonymous
            .with_token(&logged_in.token)
            .me()
            .await
            .unwrap();
        assert_eq!(me["user"]["id"], registered.user.id.as_str());
        assert_eq!(me["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn test_proxy_forwards_path_query_body_and_identity() {
        let stack = stack(100).await;
        let (client, auth) = signed_in(&stack, "alice").await;

        let resp = client
            .request(Method::POST, "/api/text/channels/42/messages?limit=5&after=x")
            .header("x-trace-id", "trace-1")
            .header("x-user-id", "spoofed")
            .body(r#"{"text":"hello"}"#)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-backend"], "text");
        let echoed: EchoedRequest = resp.json().await.unwrap();

        assert_eq!(echoed.backend, "text");
        assert_eq!(echoed.method, "POST");
        assert_eq!(echoed.path, "/api/text/channels/42/messages");
        assert_eq!(echoed.query.as_deref(), Some("limit=5&after=x"));
        assert_eq!(echoed.body, r#"{"text":"hello"}"#);
        assert_eq!(echoed.header("x-trace-id"), ["trace-1"]);
        assert_eq!(echoed.header("x-user-id"), [auth.user.id.clone()]);
        assert_eq!(echoed.header("content-type"), ["application/json"]);
        assert_eq!(echoed.header("authorization"), [format!("Bearer {}", auth.token)]);
    }

    #[tokio::test]
    async fn test_proxy_keeps_explicit_content_type() {
        let stack = stack(100).await;
        let (client, _) = signed_in(&stack, "alice").await;

        let echoed: EchoedRequest = client
            .request(Method::PUT, "/api/voice/rooms/1")
            .header("content-type", "text/plain")
            .body("plain words")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(echoed.backend, "voice");
        assert_eq!(echoed.method, "PUT");
        assert_eq!(echoed.header("content-type"), ["text/plain"]);
        assert_eq!(echoed.body, "plain words");
    }

    #[tokio::test]
    async fn test_proxy_relays_backend_status() {
        let stack = stack(100).await;
        let (client, _) = signed_in(&stack, "alice").await;

        let resp = client
            .request(Method::DELETE, "/api/text/channels/9")
            .header("x-echo-status", "409")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_proxy_response_is_byte_preserving() {
        let stack = stack(100).await;
        let (client, _) = signed_in(&stack, "alice").await;

        let direct = client
            .client
            .get(format!("{}/api/text/blob", stack.text.base_url))
            .send()
            .await
            .unwrap();
        let proxied = client
            .request(Method::GET, "/api/text/blob")
            .send()
            .await
            .unwrap();

        assert_eq!(proxied.status(), direct.status());
        for (name, _) in direct.headers() {
            if name == "date" {
                continue;
            }
            let want: Vec<_> = direct.headers().get_all(name).iter().collect();
            let got: Vec<_> = proxied.headers().get_all(name).iter().collect();
            assert_eq!(got, want, "header {name}");
        }
        assert_eq!(
            proxied.headers()["access-control-allow-origin"],
            "https://app.example"
        );
        for (name, _) in proxied.headers() {
            let name = name.as_str();
            assert!(
                direct.headers().contains_key(name) || name.starts_with("access-control-"),
                "unexpected header {name}"
            );
        }

        let want = direct.bytes().await.unwrap();
        let got = proxied.bytes().await.unwrap();
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn test_proxy_streams_large_body() {
        let stack = stack(100).await;
        let (client, _) = signed_in(&stack, "alice").await;

        let body = client
            .request(Method::GET, "/api/voice/large")
            .send()
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();

        assert_eq!(body.len(), LARGE_BODY_LEN);
        assert_eq!(body.as_ref(), large_body().as_slice());
    }

    #[tokio::test]
    async fn test_unauthenticated_calls_never_reach_backend() {
        let stack = stack(100).await;
        let anonymous = stack.gateway.client();

        let missing = anonymous
            .request(Method::GET, "/api/text/channels")
            .send()
            .await
            .unwrap();
        let invalid = anonymous
            .with_token("not-a-token")
            .request(Method::GET, "/api/voice/rooms")
            .header("x-user-id", "spoofed")
            .send()
            .await
            .unwrap();

        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(stack.text.hits(), 0);
        assert_eq!(stack.voice.hits(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_502() {
        // Bind then drop a listener to get a port nothing listens on.
        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_url = format!("http://{}", dead.local_addr().unwrap());
        drop(dead);

        let voice = EchoBackend::start("voice").await.unwrap();
        let gateway = TestGateway::start(
            Arc::new(MemoryStore::new()),
            &dead_url,
            &voice.base_url,
            100,
        )
        .await
        .unwrap();
        let auth = gateway.client().register("alice", "hunter22").await.unwrap();
        let client = gateway.client().with_token(&auth.token);

        let resp = client
            .request(Method::GET, "/api/text/channels")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Text service unavailable" }));

        let status: Value = client
            .request(Method::GET, "/health/services")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["text_service"]["status"], "unhealthy");
        assert_eq!(status["voice_service"]["status"], "healthy");
        assert_eq!(status["voice_service"]["url"], voice.base_url.as_str());

        // The voice proxy keeps working while text is down.
        let resp = client
            .request(Method::GET, "/api/voice/rooms")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_over_http() {
        let stack = stack(3).await;
        let client = stack.gateway.client();

        let preflight = client
            .request(Method::OPTIONS, "/api/text/channels")
            .send()
            .await
            .unwrap();
        assert_eq!(preflight.status(), StatusCode::NO_CONTENT);

        for _ in 0..3 {
            let resp = client.request(Method::GET, "/health").send().await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = client.request(Method::GET, "/health").send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_login_failures_identical_over_http() {
        let stack = stack(100).await;
        stack
            .gateway
            .client()
            .register("alice", "hunter22")
            .await
            .unwrap();
        let client = stack.gateway.client();

        let mut responses = Vec::new();
        for (username, password) in [("alice", "wrong-password"), ("nobody", "hunter22")] {
            let resp = client
                .client
                .post(client.url("/api/auth/login"))
                .json(&LoginRequest { username, password })
                .send()
                .await
                .unwrap();
            responses.push((resp.status(), resp.text().await.unwrap()));
        }

        assert_eq!(responses[0].0, StatusCode::UNAUTHORIZED);
        assert_eq!(responses[0], responses[1]);
    }

    #[tokio::test]
    async fn test_sqlite_accounts_survive_restart() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("driftway.db").display());
        let text = EchoBackend::start("text").await.unwrap();

        let registered = {
            let store = Arc::new(SqliteStore::open(&url).await.unwrap());
            let gateway = TestGateway::start(store, &text.base_url, &text.base_url, 100)
                .await
                .unwrap();
            gateway.client().register("alice", "hunter22").await.unwrap()
        };

        let store = Arc::new(SqliteStore::open(&url).await.unwrap());
        let gateway = TestGateway::start(store, &text.base_url, &text.base_url, 100)
            .await
            .unwrap();

        // Tokens are stateless, so the old one still resolves.
        let me = gateway
            .client()
            .with_token(&registered.token)
            .me()
            .await
            .unwrap();
        assert_eq!(me["user"]["id"], registered.user.id.as_str());

        let logged_in = gateway.client().login("alice", "hunter22").await.unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let duplicate = gateway.client().register("alice", "hunter22").await;
        assert!(duplicate.is_err());
    }
}
