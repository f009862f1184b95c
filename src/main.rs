//! Community BFF (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                   COMMUNITY BFF                  │
//!                      │                                                  │
//!   Client Request     │  ┌──────────┐   ┌──────────┐   ┌─────────────┐   │
//!   ───────────────────┼─▶│  http    │──▶│  gate    │──▶│ api handler │   │
//!                      │  │ server   │   │ (admit)  │   └──────┬──────┘   │
//!                      │  └──────────┘   └────┬─────┘          │          │
//!                      │        │             │ probe    run_with_retry    │
//!                      │        ▼             ▼                ▼          │
//!                      │   GET /health   ┌──────────────────────────────┐  │
//!                      │   (cached)      │ health monitor               │  │
//!                      │                 │  probe / recreate / swap     │──┼──▶ Data store
//!                      │                 └──────────────┬───────────────┘  │
//!                      │                                │ credentials      │
//!                      │                 ┌──────────────▼───────────────┐  │
//!                      │                 │ secret cache (TTL)           │──┼──▶ Parameter store
//!                      │                 │  primary → env fallback      │  │
//!                      │                 └──────────────────────────────┘  │
//!                      └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use community_bff::config::load_config;
use community_bff::lifecycle::{bootstrap, signals, startup};
use community_bff::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "community-bff")]
#[command(about = "Backend-for-frontend with data store health supervision", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults and BFF_* variables apply without it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("community-bff v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        data_store = %config.data_store.endpoint,
        request_deadline_secs = config.request_deadline().as_secs(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let services = bootstrap(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    startup::run(config, services, listener, signals::wait_for_signal()).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
