//! tidekv server entry point.
//!
//! Parses the configuration, sets up logging and runs the listener until
//! Ctrl+C.

use anyhow::Context;
use clap::Parser;
use tidekv::{Config, Server};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse().validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log))
        .context("invalid log filter")?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    info!(
        version = tidekv::VERSION,
        addr = %config.bind_address(),
        max_buffer = config.max_buffer_size,
        "Starting tidekv"
    );

    let server = Server::bind(&config)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;

    server
        .run(async {
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Server shutdown complete");
    Ok(())
}
