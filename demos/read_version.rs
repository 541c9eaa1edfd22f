//! Reads the version of an i-doit instance.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `IDOIT_URL`: JSON-RPC endpoint of your i-doit instance
//! - `IDOIT_KEY`: API key
//! - `IDOIT_USERNAME` / `IDOIT_PASSWORD`: optional, enables a session login
//!
//! # Usage
//!
//! ```bash
//! IDOIT_URL=https://cmdb.example.com/src/jsonrpc.php IDOIT_KEY=xxx \
//!     cargo run --example read_version
//! ```

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use idoit_api_client::{ApiClient, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("idoit_api_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(endpoint = %config.endpoint(), "Configuration loaded");

    let mut client = ApiClient::new(config);

    if client.config().credentials().is_some() {
        client.login().await.context("Failed to log in")?;
    }

    let version = client
        .idoit()
        .read_version()
        .await
        .context("Failed to read version")?;

    println!("i-doit {}", version.display());
    if let Some(login) = &version.login {
        println!(
            "authenticated as {} ({})",
            login.username.as_deref().unwrap_or("unknown"),
            login.mandator.as_deref().unwrap_or("unknown tenant")
        );
    }

    if let Some(info) = client.last_info() {
        tracing::info!(
            status = %info.status,
            elapsed_ms = info.duration.as_millis() as u64,
            "Round trip finished"
        );
    }

    client.close().await;
    Ok(())
}
