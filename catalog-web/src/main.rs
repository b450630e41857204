use anyhow::Result;
use catalog_core::CatalogConfig;
use catalog_web::{router, AppState};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_web=info,catalog_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get configuration from environment
    let config = CatalogConfig::from_env();
    let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());

    let state = AppState::new(config).await?;
    let storage = state.catalog.storage_kind();
    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Catalog admin listening on {} (storage: {})", addr, storage);

    axum::serve(listener, app).await?;

    Ok(())
}
