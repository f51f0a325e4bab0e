pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

use std::sync::Arc;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{Result, TopologyError};

// Export engine entry points
pub use logic::{
    BreakerGraph, BreakerLoadMode, CableCalculator, CableReport, EngineSettings, PanelTree,
    Synchronizer, TopologyOperations, TopologyQueries, UnknownCrossSectionPolicy,
};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{MemoryStore, Store, TopologyStore};

/// Build the HTTP application around a store
pub fn build_app<S: Store + 'static>(store: S, settings: EngineSettings) -> axum::Router {
    api::routes::create_router::<S>().with_state(Arc::new(api::handlers::AppContext::new(store, settings)))
}

/// Open the configured store
pub async fn open_store(config: &config::AppConfig) -> anyhow::Result<MemoryStore> {
    let store = match &config.storage.snapshot_path {
        Some(path) => MemoryStore::open(path).await?,
        None => MemoryStore::new(),
    };
    Ok(store)
}

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = config::AppConfig::load()?;
    let store = open_store(&config).await?;
    let app = build_app(store, config.engine_settings());

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;

    serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_store_without_snapshot_is_empty() {
        let config = config::AppConfig::default();
        let store = open_store(&config).await.unwrap();
        assert!(store.snapshot_path().is_none());
        assert_eq!(store.snapshot().await.panel_count(), 0);
    }
}
