//! AlgoStream API Server binary.
//!
//! Entry point for the WebSocket streaming hub.

use algostream_api::{HubConfig, HubState, Server};
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,algostream_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = HubConfig::from_env().context("invalid configuration")?;

    tracing::info!(
        "Starting AlgoStream streaming hub on {}:{}",
        config.host,
        config.port
    );
    tracing::info!("Tick interval: {:?}", config.tick_interval());
    tracing::info!("P&L interval: {:?}", config.pnl_interval());

    let state = HubState::new(config);
    Server::new(state).run().await.context("server failed")?;

    Ok(())
}
