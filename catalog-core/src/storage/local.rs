use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use uuid::Uuid;

use super::{StorageBackend, StoredObject};

/// One directory per collection under `root`.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the collection directories up front.
    pub async fn ensure_collections<'a>(
        &self,
        collections: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        for collection in collections {
            let dir = self.collection_dir(collection);
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    fn path(&self, collection: &str, filename: &str) -> PathBuf {
        self.collection_dir(collection).join(filename)
    }

    async fn describe(&self, collection: &str, filename: &str) -> Result<StoredObject> {
        let path = self.path(collection, filename);
        let metadata = fs::metadata(&path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        Ok(StoredObject {
            filename: filename.to_string(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            asset_id: format!("{collection}/{filename}"),
        })
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredObject>> {
        let dir = self.collection_dir(collection);
        tracing::debug!("Local LIST: dir={}", dir.display());

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", dir.display()))
            }
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to read {}", dir.display()))?
        {
            let metadata = entry
                .metadata()
                .await
                .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
            if !metadata.is_file() {
                continue;
            }
            let Ok(filename) = entry.file_name().into_string() else {
                tracing::warn!("Skipping non UTF-8 filename: {}", entry.path().display());
                continue;
            };
            objects.push(StoredObject {
                asset_id: format!("{collection}/{filename}"),
                filename,
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        Ok(objects)
    }

    async fn put(&self, collection: &str, filename: &str, data: Vec<u8>) -> Result<StoredObject> {
        let dir = self.collection_dir(collection);
        tracing::debug!(
            "Local PUT: dir={}, filename={}, size={} bytes",
            dir.display(),
            filename,
            data.len()
        );

        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        // Written next to the target and renamed into place.
        let temp = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        let target = self.path(collection, filename);
        fs::write(&temp, &data)
            .await
            .with_context(|| format!("Failed to write {}", temp.display()))?;
        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e).with_context(|| format!("Failed to move file into {}", target.display()));
        }

        self.describe(collection, filename).await
    }

    async fn get(&self, collection: &str, filename: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(collection, filename);
        tracing::debug!("Local GET: path={}", path.display());

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn exists(&self, collection: &str, filename: &str) -> Result<bool> {
        let path = self.path(collection, filename);
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to stat {}", path.display())),
        }
    }

    async fn remove(&self, collection: &str, filename: &str) -> Result<bool> {
        let path = self.path(collection, filename);
        tracing::debug!("Local DELETE: path={}", path.display());

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    async fn rename(&self, collection: &str, from: &str, to: &str) -> Result<()> {
        let source = self.path(collection, from);
        let target = self.path(collection, to);
        tracing::debug!("Local RENAME: {} -> {}", source.display(), target.display());

        fs::rename(&source, &target).await.with_context(|| {
            format!(
                "Failed to rename {} to {}",
                source.display(),
                target.display()
            )
        })
    }

    fn public_url(&self, collection: &str, filename: &str) -> String {
        format!("/uploads/{collection}/{filename}")
    }
}
