//! Dispatch-path configuration.

use std::time::Duration;

/// Per-call timeout for proxied requests.
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-call timeout for backend health checks.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest inbound body the proxy will buffer.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Settings the router and its middleware read at request time.
///
/// | Field                    | Default                  |
/// |--------------------------|--------------------------|
/// | `environment`            | `development`            |
/// | `text_service_url`       | `http://localhost:4000`  |
/// | `voice_service_url`      | `http://localhost:9090`  |
/// | `rate_limit_requests`    | `100`                    |
/// | `rate_limit_window`      | 900 seconds              |
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Deployment environment name.
    pub environment: String,
    /// Base URL of the text backend.
    pub text_service_url: String,
    /// Base URL of the voice backend.
    pub voice_service_url: String,
    /// Requests admitted per window.
    pub rate_limit_requests: u32,
    /// Rate-limit window.
    pub rate_limit_window: Duration,
    /// Proxied request timeout.
    pub proxy_timeout: Duration,
    /// Health check timeout.
    pub health_timeout: Duration,
    /// Inbound body limit for proxied requests.
    pub max_body_bytes: usize,
}

impl GatewayConfig {
    /// Whether this is a production deployment.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            text_service_url: "http://localhost:4000".into(),
            voice_service_url: "http://localhost:9090".into(),
            rate_limit_requests: 100,
            rate_limit_window: Duration::from_secs(900),
            proxy_timeout: DEFAULT_PROXY_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}
