//! Wiki Backend
//!
//! REST server for wiki pages and comments with SQLite persistence.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wiki_backend::config::Config;
use wiki_backend::store::{DocumentStore, SqliteDocumentStore};
use wiki_backend::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wiki Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Main namespace: {}", config.main_db_name);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (WIKI_API_PSK). Authentication is disabled!");
    }

    // Initialize document store
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::open(&config.db_path).await?);

    let bind_addr = config.bind_addr;
    let app = create_router(AppState::new(store, config));

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
