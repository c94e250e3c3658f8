//! Operator CLI for a running gateway.
//!
//! Talks to the admin endpoints over HTTP:
//!
//! ```text
//! gateway-cli health
//! gateway-cli stats
//! gateway-cli breakers
//! gateway-cli reset usuarios
//! gateway-cli reset-all
//! ```

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli", about = "Inspect and control a running campus gateway")]
struct Cli {
    /// Gateway base URL.
    #[arg(long, default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token for protected endpoints.
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Liveness and breaker rollup.
    Health,
    /// Request log summary.
    Stats,
    /// Per-service circuit breaker snapshots.
    Breakers,
    /// Reset one circuit breaker to CLOSED.
    Reset { service: String },
    /// Reset every circuit breaker.
    ResetAll,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let (method, path) = match &cli.command {
        Command::Health => (reqwest::Method::GET, "/health".to_string()),
        Command::Stats => (reqwest::Method::GET, "/stats".to_string()),
        Command::Breakers => (reqwest::Method::GET, "/circuit-breakers".to_string()),
        Command::Reset { service } => (
            reqwest::Method::POST,
            format!("/circuit-breakers/{service}/reset"),
        ),
        Command::ResetAll => (
            reqwest::Method::POST,
            "/circuit-breakers/reset-all".to_string(),
        ),
    };

    let mut request = client.request(method, format!("{}{}", cli.url.trim_end_matches('/'), path));
    if let Some(token) = &cli.token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        eprintln!("request failed with status {status}");
        std::process::exit(1);
    }
    Ok(())
}
