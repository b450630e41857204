use std::sync::Arc;

use anyhow::Result;
use catalog_core::{CatalogConfig, CatalogService};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    pub async fn new(config: CatalogConfig) -> Result<Self> {
        let catalog = CatalogService::from_config(config).await?;

        Ok(Self::from_service(catalog))
    }

    pub fn from_service(catalog: CatalogService) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}
