mod config;
mod monitor;

use crate::config::Config;
use crate::monitor::FeedMonitor;
use anyhow::{Context, Result};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Feed Monitor Service...");

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        "Price feed: {} every {}s",
        config.price_api_base_url, config.price_poll_interval_secs
    );

    let monitor = FeedMonitor::start(&config)?;

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    monitor.shutdown().await;
    info!("Feed Monitor Service stopped");

    Ok(())
}
