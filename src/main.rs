//! Renshuu API Server
//!
//! Run with: cargo run --bin renshuu -- [--config path/to/config.toml]
//!
//! Without `--config` the default locations are searched (see
//! [`Config::load_default`]). `RENSHUU_*` environment variables override
//! file settings; `RUST_LOG` overrides the configured log level.

use clap::Parser;
use renshuu::api::{serve, AppState};
use renshuu::config::{Config, LoggingConfig};
use renshuu::storage::StorageEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "renshuu")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Nutrition and fitness tracking API server")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config.logging);

    tracing::info!("Starting Renshuu API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {}", config.database.path);
    if config.api.admin_user_ids.is_empty() {
        tracing::warn!("No admin_user_ids configured; admin routes are unreachable");
    }

    let store = Arc::new(StorageEngine::new(config.storage_config()).await?);
    tracing::info!("Storage stats: {}", store.stats().await?);

    let state = AppState::with_hub_config(
        Arc::clone(&store),
        config.api.clone(),
        config.hub_config(),
    );

    serve(state, &config.api).await?;

    tracing::info!("Renshuu API server stopped");
    Ok(())
}

/// `pretty` or `json` output filtered by `RUST_LOG` or the configured level
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("renshuu={},tower_http=debug", logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format.as_str() {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }
}
