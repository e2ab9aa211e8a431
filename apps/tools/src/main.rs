use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{ChartImages, ChartMailClient};
use shared::protocol::{health_route, HealthResponse, DEFAULT_RELAY_PORT};
use tracing_subscriber::EnvFilter;

/// 1x1 PNG used by `send-test`.
const TEST_PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR4nGMAAQAABQABDQottAAAAABJRU5ErkJggg==";

#[derive(Parser, Debug)]
#[command(about = "Helpers for poking a running Bucks2Bar mail relay")]
struct Cli {
    /// Relay base URL. Defaults to `API_BASE`, then `http://localhost:$PORT`.
    #[arg(long)]
    api_base: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calls `GET /health`.
    Health,
    /// Sends a tiny PNG as both charts.
    SendTest {
        /// Recipient; defaults to `TEST_EMAIL`.
        #[arg(long)]
        email: Option<String>,
    },
}

fn default_api_base() -> String {
    if let Ok(base) = std::env::var("API_BASE") {
        return base;
    }
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_RELAY_PORT);
    format!("http://localhost:{port}")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let api_base = cli.api_base.unwrap_or_else(default_api_base);

    match cli.command {
        Command::Health => {
            let url = format!("{}{}", api_base.trim_end_matches('/'), health_route());
            let res = reqwest::get(&url)
                .await
                .with_context(|| format!("failed to reach {url}"))?;
            println!("Status: {}", res.status());
            let health: HealthResponse = res.json().await.context("invalid health body")?;
            println!("Response: {}", serde_json::to_string_pretty(&health)?);
        }
        Command::SendTest { email } => {
            let email = email
                .or_else(|| std::env::var("TEST_EMAIL").ok())
                .context("no recipient: pass --email or set TEST_EMAIL")?;
            let client = ChartMailClient::new(api_base);
            let charts = ChartImages {
                monthly_chart: TEST_PNG_DATA_URL.to_string(),
                totals_pie_chart: TEST_PNG_DATA_URL.to_string(),
            };
            let response = client
                .send_charts(&email, &charts)
                .await
                .with_context(|| format!("relay at {} refused the charts", client.api_base()))?;
            println!("Response: {}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
