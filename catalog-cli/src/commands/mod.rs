pub mod delete;
pub mod manifest;
pub mod replace;
pub mod scan;
pub mod upload;

use std::path::PathBuf;

use anyhow::Result;
use catalog_core::{CatalogConfig, CatalogService, StorageConfig};

/// Build the service from the environment, or from `--local` when given.
pub async fn open_catalog(local: Option<PathBuf>) -> Result<CatalogService> {
    let mut config = CatalogConfig::from_env();
    if let Some(root) = local {
        config.storage = StorageConfig::Local { root };
    }
    CatalogService::from_config(config).await
}
