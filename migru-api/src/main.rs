//! migru-api - migraine tracking backend service

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use migru_api::config::{Args, ServiceConfig};
use migru_api::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting migru-api");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = ServiceConfig::resolve(&args);

    migru_common::config::ensure_data_dir(&config.data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to initialize data directory: {}", e))?;

    let db_path = migru_common::config::database_path(&config.data_dir);
    info!("Database: {}", db_path.display());

    let db_pool = migru_api::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let port = config.port;
    let state = AppState::new(db_pool, config);
    let app = migru_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on http://0.0.0.0:{}", port);
    info!("Health check: http://0.0.0.0:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
