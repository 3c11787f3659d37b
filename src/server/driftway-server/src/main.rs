//! Driftway Server - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use driftway_api::{AppState, GatewayConfig};
use driftway_auth::AuthService;
use driftway_storage::{CredentialStore, MemoryStore};
use driftway_storage_sqlite::SqliteStore;
use driftway_token::TokenCodec;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_TOKEN_SECRET: &str = "default-jwt-secret";

#[derive(Parser, Debug)]
#[command(name = "driftway-server")]
#[command(about = "Driftway API gateway - auth, rate limiting and reverse proxy")]
#[command(version)]
struct Cli {
    /// Listen host
    #[arg(long, default_value = "0.0.0.0", env = "DRIFTWAY_HOST")]
    host: String,

    /// Listen port
    #[arg(long, default_value_t = 8080, env = "DRIFTWAY_PORT")]
    port: u16,

    /// Deployment environment (development, production)
    #[arg(long, default_value = "development", env = "DRIFTWAY_ENV")]
    environment: String,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, default_value = "info", env = "DRIFTWAY_LOG_LEVEL")]
    log_level: String,

    /// Credential store URI (memory: or sqlite:<path>)
    #[arg(long, default_value = "sqlite:data/driftway.db", env = "DRIFTWAY_STORE_URI")]
    store_uri: String,

    /// Cache URL (reserved)
    #[arg(long, default_value = "redis://localhost:6379", env = "DRIFTWAY_CACHE_URL")]
    cache_url: String,

    /// Token signing secret
    #[arg(long, default_value = DEFAULT_TOKEN_SECRET, env = "DRIFTWAY_TOKEN_SECRET", hide_default_value = true)]
    token_secret: String,

    /// API secret (reserved)
    #[arg(long, default_value = "default-api-secret", env = "DRIFTWAY_API_SECRET", hide_default_value = true)]
    api_secret: String,

    /// API key hash (reserved)
    #[arg(long, default_value = "default-api-key-hash", env = "DRIFTWAY_API_KEY_HASH", hide_default_value = true)]
    api_key_hash: String,

    /// Text service base URL
    #[arg(long, default_value = "http://localhost:4000", env = "DRIFTWAY_TEXT_SERVICE_URL")]
    text_service_url: String,

    /// Voice service base URL
    #[arg(long, default_value = "http://localhost:9090", env = "DRIFTWAY_VOICE_SERVICE_URL")]
    voice_service_url: String,

    /// Requests admitted per rate-limit window
    #[arg(long, default_value_t = 100, env = "DRIFTWAY_RATE_LIMIT_REQUESTS", value_parser = clap::value_parser!(u32).range(1..))]
    rate_limit_requests: u32,

    /// Rate-limit window in seconds
    #[arg(long = "rate-limit-window", default_value_t = 900, env = "DRIFTWAY_RATE_LIMIT_WINDOW", value_parser = clap::value_parser!(u64).range(1..))]
    rate_limit_window_secs: u64,

    /// Whitelisted client IPs, comma separated (reserved)
    #[arg(long, env = "DRIFTWAY_WHITELISTED_IPS", value_delimiter = ',')]
    whitelisted_ips: Vec<String>,

    /// Enable development mode (in-memory store)
    #[arg(long, env = "DRIFTWAY_DEV_MODE")]
    dev: bool,
}

impl Cli {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            environment: self.environment.clone(),
            text_service_url: self.text_service_url.clone(),
            voice_service_url: self.voice_service_url.clone(),
            rate_limit_requests: self.rate_limit_requests,
            rate_limit_window: Duration::from_secs(self.rate_limit_window_secs),
            ..GatewayConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // RUST_LOG wins over the configured level.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting Driftway gateway...");
    log_config(&cli);

    let config = cli.gateway_config();
    warn_default_secret(&cli.token_secret, config.is_production());

    if cli.dev {
        warn!("Development mode enabled - DO NOT USE IN PRODUCTION");
    }

    let store = open_store(&cli.store_uri, cli.dev).await?;
    info!(store = store.name(), "credential store ready");

    let auth = AuthService::new(store, TokenCodec::new(cli.token_secret.as_bytes()));
    let state = AppState::new(config, auth).context("Failed to build application state")?;
    let app = driftway_api::router(state);

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", cli.host, cli.port))?;
    info!(address = %listener.local_addr()?, "Driftway gateway listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Driftway gateway stopped");

    Ok(())
}

async fn open_store(uri: &str, dev: bool) -> Result<Arc<dyn CredentialStore>> {
    if dev || uri.starts_with("memory:") {
        return Ok(Arc::new(MemoryStore::new()));
    }

    if uri.starts_with("sqlite:") {
        let store = SqliteStore::open(uri)
            .await
            .with_context(|| format!("Failed to open store {uri}"))?;
        return Ok(Arc::new(store));
    }

    bail!("Unsupported store URI: {uri} (expected memory: or sqlite:)")
}

fn log_config(cli: &Cli) {
    info!(
        host = %cli.host,
        port = cli.port,
        environment = %cli.environment,
        store_uri = %cli.store_uri,
        cache_url = %cli.cache_url,
        text_service_url = %cli.text_service_url,
        voice_service_url = %cli.voice_service_url,
        rate_limit_requests = cli.rate_limit_requests,
        rate_limit_window_secs = cli.rate_limit_window_secs,
        whitelisted_ips = ?cli.whitelisted_ips,
        token_secret = redact(&cli.token_secret),
        api_secret = redact(&cli.api_secret),
        api_key_hash = redact(&cli.api_key_hash),
        "configuration loaded"
    );
}

fn warn_default_secret(secret: &str, production: bool) {
    if secret != DEFAULT_TOKEN_SECRET {
        return;
    }
    if production {
        error!("Token secret is the built-in default in production - set DRIFTWAY_TOKEN_SECRET");
    } else {
        warn!("Token secret is the built-in default - set DRIFTWAY_TOKEN_SECRET");
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down...");
}
