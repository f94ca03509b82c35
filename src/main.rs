mod actor_framework;
mod app_system;
mod cart_actor;
mod catalog;
mod cli;
mod clients;
mod config;
mod domain;
mod fulfillment;
mod legacy;
mod order_actor;
mod storage;

#[cfg(test)]
mod mock_framework;

use clap::Parser;
use tracing::{info, Instrument};

use crate::app_system::{setup_tracing, StorefrontSystem};
use crate::cli::Args;
use crate::config::StorefrontConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup tracing once for the entire application
    setup_tracing(&args.log_level);

    let config = StorefrontConfig::from_file_or_default(&args.config).await?;
    info!(config = %args.config.display(), "Configuration loaded");

    // Starts every actor and resumes unfinished deliveries
    let system = StorefrontSystem::start(&config).await?;

    let span = tracing::info_span!("command");
    let result = cli::run(args.command, &system).instrument(span).await;

    // Shutdown system gracefully, even when the command failed
    system.shutdown().await?;
    result
}
