use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ravell_backend::api::{self, AppState};
use ravell_backend::config::Config;
use ravell_backend::db::init_database;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,ravell_backend=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    Config::init()?;
    info!("Initialized configuration");

    // Initialize database, run migrations and seed achievements
    let db = Arc::new(init_database().await?);
    info!("Connected to database");

    // Wire the shared state: pool, notification registry, push and mail
    let state = AppState::new(&db);

    // Start API server; it shuts down gracefully on SIGINT
    api::start_api_server(state).await?;

    info!("Ravell backend shutdown complete");
    Ok(())
}
