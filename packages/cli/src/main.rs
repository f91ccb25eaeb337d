use axum::http::Method;
use sowkit_api::AppState;
use sowkit_proposals::storage::sqlite::SqliteProposalStorage;
use sowkit_proposals::storage::{ProposalStorage, StorageConfig};
use sowkit_proposals::{LoggingNotifier, ProposalsManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

mod config;

use config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sowkit=info,tower_http=warn")),
        )
        .init();

    let config = Config::from_env()?;

    let storage_config = StorageConfig {
        path: config.database_path.clone(),
        ..StorageConfig::default()
    };
    let storage = Arc::new(SqliteProposalStorage::new(&storage_config).await?);
    storage.initialize().await?;

    let manager = Arc::new(ProposalsManager::new(storage, Arc::new(LoggingNotifier)));
    let state = AppState::new(manager);

    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<axum::http::HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = sowkit_api::create_router(state).layer(cors);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("sowkit server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
