//! Weather Station Server
//!
//! Run with: cargo run --bin weather-station
//!
//! # Configuration
//!
//! Reads `--config <path>` or the default config locations, then applies
//! environment overrides:
//! - `HOST`, `PORT` (default: 0.0.0.0:3001)
//! - `DB_NAME`, `DB_DIR` (default: ./weather_station.db)
//! - `DB_POOL_SIZE` (default: 10)
//! - `DB_HOST`, `DB_USER`, `DB_PASSWORD` (accepted, unused by SQLite)
//! - `HISTORY_WINDOW_HOURS` (default: 24)
//! - `LOG_LEVEL`, `LOG_FORMAT` or `RUST_LOG`

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weather_station::api::{serve, AppState};
use weather_station::config::{Config, LoggingConfig};
use weather_station::storage::SqliteStore;

#[derive(Parser)]
#[command(name = "weather-station")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Weather station backend: ingest, store and stream sensor readings")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::resolve(args.config.as_deref()).context("Failed to load config")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config.logging);

    tracing::info!("Starting weather station v{}", env!("CARGO_PKG_VERSION"));

    for setting in config.database.ignored_settings() {
        tracing::warn!(setting, "Ignored: the embedded SQLite database has no server or accounts");
    }

    tracing::info!("Database file: {:?}", config.database.db_path());
    let store = Arc::new(
        SqliteStore::open(&config.database)
            .await
            .context("Failed to open measurement store")?,
    );

    let state = AppState::with_hub_config(
        store.clone(),
        config.server.clone(),
        config.websocket.hub_config(),
    );

    tracing::info!("Starting server on {}", config.server.addr());
    serve(state, &config.server).await?;

    store.shutdown();
    tracing::info!("Weather station stopped");

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("weather_station={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
