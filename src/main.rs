//! scrollharvest - incremental infinite-scroll product harvester.
//!
//! Harvests structured product records from a dynamically loaded collection
//! page, deduplicating by product name and persisting progress through a
//! checkpoint file so an interrupted run can resume where it left off.

mod checkpoint;
mod cli;
mod config;
mod driver;
mod harvest;
mod models;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "harvest=info"
    } else {
        "harvest=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cli::run().await
}
