//! Driftway CLI - Command line client for the gateway.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "driftway")]
#[command(about = "Driftway CLI - Talk to a Driftway API gateway")]
#[command(version)]
struct Cli {
    /// Gateway address
    #[arg(long, default_value = "http://localhost:8080", env = "DRIFTWAY_ADDR")]
    addr: String,

    /// Bearer token
    #[arg(long, env = "DRIFTWAY_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway and backend status
    Status,
    /// Create an account and print its token
    Register {
        /// Username (3-50 characters)
        username: String,
        /// Email address
        email: String,
        /// Password (prompted if not provided)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in and print a token
    Login {
        /// Username or email
        username: String,
        /// Password (prompted if not provided)
        #[arg(long)]
        password: Option<String>,
    },
    /// Show the authenticated user
    Me,
    /// Send an authenticated request through the gateway
    Request {
        /// HTTP method
        method: String,
        /// Path, e.g. /api/text/channels
        path: String,
        /// JSON body
        #[arg(long)]
        data: Option<String>,
    },
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    service: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct BackendHealth {
    status: String,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServicesHealth {
    text_service: BackendHealth,
    voice_service: BackendHealth,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserView {
    id: String,
    username: String,
    email: String,
    status: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    user: UserView,
    token: String,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    user: UserView,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// HTTP Client
// ============================================================================

struct DriftwayClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl DriftwayClient {
    fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .context("Authentication token required. Set DRIFTWAY_TOKEN or use --token")
    }

    async fn health(&self) -> Result<HealthResponse> {
        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .context("Failed to connect to gateway")?;

        let resp = ensure_success(resp, "Health check failed").await?;
        resp.json().await.context("Failed to parse response")
    }

    async fn services_health(&self) -> Result<ServicesHealth> {
        let resp = self
            .client
            .get(self.url("/health/services"))
            .send()
            .await
            .context("Failed to connect to gateway")?;

        let resp = ensure_success(resp, "Service health check failed").await?;
        resp.json().await.context("Failed to parse response")
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let req = RegisterRequest {
            username,
            email,
            password,
        };

        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&req)
            .send()
            .await
            .context("Failed to connect to gateway")?;

        let resp = ensure_success(resp, "Registration failed").await?;
        resp.json().await.context("Failed to parse response")
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let req = LoginRequest { username, password };

        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&req)
            .send()
            .await
            .context("Failed to connect to gateway")?;

        let resp = ensure_success(resp, "Login failed").await?;
        resp.json().await.context("Failed to parse response")
    }

    async fn me(&self) -> Result<MeResponse> {
        let resp = self
            .client
            .get(self.url("/api/auth/me"))
            .bearer_auth(self.token()?)
            .send()
            .await
            .context("Failed to connect to gateway")?;

        let resp = ensure_success(resp, "Request failed").await?;
        resp.json().await.context("Failed to parse response")
    }

    async fn request(&self, method: Method, path: &str, data: Option<Value>) -> Result<Response> {
        let mut req = self
            .client
            .request(method, self.url(path))
            .bearer_auth(self.token()?);

        if let Some(data) = data {
            req = req.json(&data);
        }

        req.send().await.context("Failed to connect to gateway")
    }
}

async fn ensure_success(resp: Response, what: &str) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status();
    let error: ErrorResponse = resp.json().await.unwrap_or(ErrorResponse {
        error: "Unknown error".into(),
    });
    bail!("{what} ({status}): {}", error.error)
}

// ============================================================================
// Command Handlers
// ============================================================================

async fn cmd_status(client: &DriftwayClient) -> Result<()> {
    let health = client.health().await?;
    println!("Driftway gateway status:");
    println!("  Status:    {}", health.status);
    println!("  Service:   {}", health.service);
    println!("  Timestamp: {}", health.timestamp);

    let services = client.services_health().await?;
    println!();
    println!("Backends:");
    print_backend("Text", &services.text_service);
    print_backend("Voice", &services.voice_service);

    Ok(())
}

fn print_backend(name: &str, health: &BackendHealth) {
    match (&health.url, &health.error) {
        (Some(url), _) => println!("  {name:<6} {} ({url})", health.status),
        (None, Some(error)) => println!("  {name:<6} {} - {error}", health.status),
        (None, None) => println!("  {name:<6} {}", health.status),
    }
}

async fn cmd_register(
    client: &DriftwayClient,
    username: &str,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let password = read_password(password)?;
    let result = client.register(username, email, &password).await?;

    println!("Registered {} ({})", result.user.username, result.user.id);
    print_token(&result.token);
    Ok(())
}

async fn cmd_login(client: &DriftwayClient, username: &str, password: Option<String>) -> Result<()> {
    let password = read_password(password)?;
    let result = client.login(username, &password).await?;

    println!("Logged in as {} ({})", result.user.username, result.user.id);
    print_token(&result.token);
    Ok(())
}

async fn cmd_me(client: &DriftwayClient) -> Result<()> {
    let me = client.me().await?;
    let user = me.user;

    println!("User:");
    println!("  ID:       {}", user.id);
    println!("  Username: {}", user.username);
    println!("  Email:    {}", user.email);
    println!("  Status:   {}", user.status);
    println!("  Created:  {}", user.created_at);
    Ok(())
}

async fn cmd_request(
    client: &DriftwayClient,
    method: &str,
    path: &str,
    data: Option<String>,
) -> Result<()> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {method}"))?;
    let data = data
        .map(|raw| serde_json::from_str::<Value>(&raw).context("--data must be valid JSON"))
        .transpose()?;

    let resp = client.request(method, path, data).await?;
    let status = resp.status();
    let body = resp.text().await.context("Failed to read response body")?;

    eprintln!("{status}");
    match serde_json::from_str::<Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }

    if !status.is_success() {
        bail!("Request failed with status {status}");
    }
    Ok(())
}

fn print_token(token: &str) {
    println!();
    println!("Token: {token}");
    println!();
    println!("Export it for later commands:");
    println!("  export DRIFTWAY_TOKEN={token}");
}

fn read_password(password: Option<String>) -> Result<String> {
    let password = match password {
        Some(p) => p,
        None => {
            print!("Password: ");
            io::stdout().flush()?;

            let stdin = io::stdin();
            let mut line = String::new();
            stdin.lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        },
    };

    if password.is_empty() {
        bail!("Password cannot be empty");
    }
    Ok(password)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = DriftwayClient::new(&cli.addr, cli.token)?;

    match cli.command {
        Commands::Status => cmd_status(&client).await,
        Commands::Register {
            username,
            email,
            password,
        } => cmd_register(&client, &username, &email, password).await,
        Commands::Login { username, password } => cmd_login(&client, &username, password).await,
        Commands::Me => cmd_me(&client).await,
        Commands::Request { method, path, data } => {
            cmd_request(&client, &method, &path, data).await
        },
    }
}
