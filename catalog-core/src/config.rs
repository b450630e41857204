use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::collections::CollectionSet;
use crate::naming::{UploadPolicy, MAX_UPLOAD_BYTES};
use crate::storage::{LocalBackend, S3Backend, S3Settings, StorageBackend};

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Local { root: PathBuf },
    S3(S3Settings),
}

impl StorageConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::S3(_) => "s3",
        }
    }

    /// Build the backend this configuration describes.
    pub async fn open(&self, collections: &CollectionSet) -> Result<Arc<dyn StorageBackend>> {
        match self {
            Self::Local { root } => {
                let backend = LocalBackend::new(root.clone());
                backend.ensure_collections(collections.ids()).await?;
                tracing::info!("Using local storage at {}", root.display());
                Ok(Arc::new(backend))
            }
            Self::S3(settings) => {
                let backend = S3Backend::new(settings.clone()).await?;
                tracing::info!(
                    "Using S3 storage: bucket={}, prefix={}",
                    settings.bucket,
                    settings.prefix
                );
                Ok(Arc::new(backend))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub storage: StorageConfig,
    pub collections: CollectionSet,
    pub policy: UploadPolicy,
    /// Where `generate_manifest` also writes its document.
    pub manifest_path: Option<PathBuf>,
}

impl CatalogConfig {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig::Local { root: root.into() },
            collections: CollectionSet::default(),
            policy: UploadPolicy::default(),
            manifest_path: None,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. The hosted backend needs a bucket
    /// and both credential halves; anything less falls back to local disk.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let bucket = first(&["CATALOG_BUCKET", "S3_BUCKET"]);
        let access_key = first(&["CATALOG_ACCESS_KEY", "AWS_ACCESS_KEY_ID"]);
        let secret_key = first(&["CATALOG_SECRET_KEY", "AWS_SECRET_ACCESS_KEY"]);

        let storage = match (bucket, access_key, secret_key) {
            (Some(bucket), Some(access_key), Some(secret_key)) => StorageConfig::S3(S3Settings {
                bucket,
                prefix: first(&["CATALOG_BUCKET_PREFIX"]).unwrap_or_default(),
                access_key,
                secret_key,
                region: first(&["CATALOG_REGION", "AWS_REGION"]),
                endpoint_url: first(&["AWS_ENDPOINT_URL"]),
                public_url: first(&["CATALOG_PUBLIC_URL"]),
            }),
            (bucket, access_key, secret_key) => {
                if bucket.is_some() || access_key.is_some() || secret_key.is_some() {
                    tracing::warn!(
                        "Incomplete S3 configuration (bucket={}, access key={}, secret={}), using local storage",
                        bucket.is_some(),
                        access_key.is_some(),
                        secret_key.is_some()
                    );
                }
                let root = first(&["CATALOG_UPLOAD_DIR", "UPLOAD_FOLDER"])
                    .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string());
                StorageConfig::Local { root: root.into() }
            }
        };

        let allow_gif = first(&["CATALOG_ALLOW_GIF"])
            .map(|value| !matches!(value.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        Self {
            storage,
            collections: CollectionSet::default(),
            policy: UploadPolicy::new(allow_gif, MAX_UPLOAD_BYTES),
            manifest_path: first(&["CATALOG_MANIFEST_PATH"]).map(PathBuf::from),
        }
    }
}
