//! The catalog service: validation, naming, per-collection locking and
//! compaction on top of a [`StorageBackend`].

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::collections::{Collection, CollectionSet};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::manifest::{ImageEntry, ManifestDocument, ScanReport};
use crate::naming::{self, UploadPolicy};
use crate::storage::{StorageBackend, StoredObject};

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub collection: String,
    pub asset_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// Result of a delete. `found` is false when the image was already gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub found: bool,
    pub renamed: Vec<Rename>,
}

pub struct CatalogService {
    collections: CollectionSet,
    policy: UploadPolicy,
    backend: Arc<dyn StorageBackend>,
    manifest_path: Option<PathBuf>,
    locks: HashMap<String, Arc<Mutex<()>>>,
}

impl CatalogService {
    pub fn new(
        collections: CollectionSet,
        policy: UploadPolicy,
        backend: Arc<dyn StorageBackend>,
    ) -> Self {
        let locks = collections
            .ids()
            .map(|id| (id.to_string(), Arc::new(Mutex::new(()))))
            .collect();
        Self {
            collections,
            policy,
            backend,
            manifest_path: None,
            locks,
        }
    }

    /// Open the configured backend and build a service around it.
    pub async fn from_config(config: CatalogConfig) -> anyhow::Result<Self> {
        let backend = config.storage.open(&config.collections).await?;
        Ok(Self::new(config.collections, config.policy, backend).with_manifest_path(config.manifest_path))
    }

    pub fn with_manifest_path(mut self, path: Option<PathBuf>) -> Self {
        self.manifest_path = path;
        self
    }

    pub fn collections(&self) -> &CollectionSet {
        &self.collections
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn storage_kind(&self) -> &'static str {
        self.backend.kind()
    }

    fn collection(&self, id: &str) -> CatalogResult<&Collection> {
        self.collections
            .get(id)
            .ok_or_else(|| CatalogError::InvalidCollection(id.to_string()))
    }

    async fn lock(&self, collection: &str) -> CatalogResult<MutexGuard<'_, ()>> {
        let lock = self
            .locks
            .get(collection)
            .ok_or_else(|| CatalogError::InvalidCollection(collection.to_string()))?;
        Ok(lock.lock().await)
    }

    /// Catalog images of a collection in listing order.
    async fn images(&self, collection: &str) -> CatalogResult<Vec<StoredObject>> {
        let mut images: Vec<StoredObject> = self
            .backend
            .list(collection)
            .await
            .map_err(CatalogError::storage)?
            .into_iter()
            .filter(|object| self.policy.is_image(&object.filename))
            .collect();
        naming::sort_names(&mut images, |object| object.filename.as_str());
        Ok(images)
    }

    fn entry(&self, collection: &str, object: StoredObject) -> ImageEntry {
        ImageEntry {
            url: self.backend.public_url(collection, &object.filename),
            size: object.size,
            modified: object.modified.map(|time| time.to_rfc3339()),
            filename: object.filename,
        }
    }

    /// List every collection. Read-only; the hero slot is always present.
    pub async fn scan(&self) -> CatalogResult<ScanReport> {
        let mut report = ScanReport::new();
        for collection in self.collections.iter() {
            let _guard = self.lock(&collection.id).await?;
            let images = self
                .images(&collection.id)
                .await?
                .into_iter()
                .map(|object| self.entry(&collection.id, object))
                .collect();
            report.add_collection(&collection.id, &collection.title, images);
        }
        Ok(report)
    }

    /// Store an upload under its catalog name.
    ///
    /// Hero uploads become `hero.{ext}` and replace whatever hero image was
    /// there; other collections get the next sequence number.
    pub async fn upload(
        &self,
        collection: &str,
        filename_hint: &str,
        data: Vec<u8>,
    ) -> CatalogResult<ImageRef> {
        let target = self.collection(collection)?;
        if data.is_empty() || filename_hint.trim().is_empty() {
            return Err(CatalogError::EmptyInput);
        }
        let ext = self.policy.check_extension(filename_hint)?;
        self.policy.check_size(data.len())?;

        let _guard = self.lock(collection).await?;
        let filename = if target.is_hero() {
            naming::hero_filename(&ext)
        } else {
            let existing = self
                .backend
                .list(collection)
                .await
                .map_err(CatalogError::storage)?;
            let count = existing
                .iter()
                .filter(|object| self.policy.is_image(&object.filename))
                .count();
            naming::next_sequence_name(
                count + 1,
                &ext,
                existing.iter().map(|object| object.filename.as_str()),
            )
        };

        let stored = self
            .backend
            .put(collection, &filename, data)
            .await
            .map_err(CatalogError::storage)?;

        // Older hero files go only once the new one is stored.
        if target.is_hero() {
            for stale in self.images(collection).await? {
                if stale.filename != stored.filename {
                    self.backend
                        .remove(collection, &stale.filename)
                        .await
                        .map_err(CatalogError::storage)?;
                    tracing::info!("Removed previous hero image {}", stale.filename);
                }
            }
        }

        tracing::info!(
            "Uploaded {} as {}/{} ({} bytes)",
            filename_hint,
            collection,
            stored.filename,
            stored.size
        );

        Ok(ImageRef {
            url: self.backend.public_url(collection, &stored.filename),
            filename: stored.filename,
            size: stored.size,
            collection: collection.to_string(),
            asset_id: stored.asset_id,
        })
    }

    /// Swap the bytes of an existing image, keeping its name.
    ///
    /// `source_name` is the uploaded file's own name; when given, its
    /// extension must be an accepted format.
    pub async fn replace(
        &self,
        collection: &str,
        filename: &str,
        data: Vec<u8>,
        source_name: Option<&str>,
    ) -> CatalogResult<ImageRef> {
        self.collection(collection)?;
        naming::check_filename(filename)?;
        if data.is_empty() {
            return Err(CatalogError::EmptyInput);
        }
        if let Some(source) = source_name.filter(|name| !name.is_empty()) {
            self.policy.check_extension(source)?;
        }
        self.policy.check_size(data.len())?;

        let _guard = self.lock(collection).await?;
        let exists = self
            .backend
            .exists(collection, filename)
            .await
            .map_err(CatalogError::storage)?;
        if !exists {
            return Err(CatalogError::NotFound {
                collection: collection.to_string(),
                filename: filename.to_string(),
            });
        }

        let stored = self
            .backend
            .put(collection, filename, data)
            .await
            .map_err(CatalogError::storage)?;
        tracing::info!("Replaced {}/{} ({} bytes)", collection, filename, stored.size);

        Ok(ImageRef {
            url: self.backend.public_url(collection, &stored.filename),
            filename: stored.filename,
            size: stored.size,
            collection: collection.to_string(),
            asset_id: stored.asset_id,
        })
    }

    /// Delete an image and renumber the rest of its collection.
    ///
    /// A missing image is not an error: the outcome reports `found: false`
    /// and nothing is renamed.
    pub async fn delete(&self, collection: &str, filename: &str) -> CatalogResult<DeleteOutcome> {
        let target = self.collection(collection)?;
        naming::check_filename(filename)?;

        let _guard = self.lock(collection).await?;
        let found = self
            .backend
            .remove(collection, filename)
            .await
            .map_err(CatalogError::storage)?;
        if !found {
            tracing::info!("Delete of missing image {}/{} ignored", collection, filename);
            return Ok(DeleteOutcome {
                found,
                renamed: Vec::new(),
            });
        }
        tracing::info!("Deleted {}/{}", collection, filename);

        let renamed = if target.is_hero() {
            Vec::new()
        } else {
            self.compact(collection).await?
        };
        Ok(DeleteOutcome { found, renamed })
    }

    /// Renumber a collection to `1..=count`. Caller holds the collection lock.
    async fn compact(&self, collection: &str) -> CatalogResult<Vec<Rename>> {
        let images = self.images(collection).await?;
        let occupied: HashSet<&str> = images.iter().map(|o| o.filename.as_str()).collect();

        let moves: Vec<Rename> = images
            .iter()
            .enumerate()
            .filter_map(|(index, object)| {
                let to = match naming::extension(&object.filename) {
                    Some(ext) => format!("{}.{ext}", index + 1),
                    None => (index + 1).to_string(),
                };
                (to != object.filename).then(|| Rename {
                    from: object.filename.clone(),
                    to,
                })
            })
            .collect();
        if moves.is_empty() {
            return Ok(moves);
        }

        // A target still held by a file that has not moved yet forces every
        // move through a staging name first.
        let staged = moves.iter().any(|m| occupied.contains(m.to.as_str()));
        if staged {
            let mut staging: Vec<(&Rename, String)> = Vec::with_capacity(moves.len());
            for m in &moves {
                let temp = format!(".{}.staging", Uuid::new_v4());
                if let Err(e) = self.rename(collection, &m.from, &temp).await {
                    self.unstage(collection, &staging).await;
                    return Err(e);
                }
                staging.push((m, temp));
            }
            for (done, (m, temp)) in staging.iter().enumerate() {
                if let Err(e) = self.rename(collection, temp, &m.to).await {
                    self.unstage(collection, &staging[done..]).await;
                    return Err(e);
                }
            }
        } else {
            for m in &moves {
                self.rename(collection, &m.from, &m.to).await?;
            }
        }

        for m in &moves {
            tracing::info!("Renumbered {}/{} -> {}", collection, m.from, m.to);
        }
        Ok(moves)
    }

    /// Move staged files back to their original names after a failed
    /// compaction. Best effort: a file whose old name is taken stays staged.
    async fn unstage(&self, collection: &str, staged: &[(&Rename, String)]) {
        for (m, temp) in staged {
            match self.backend.exists(collection, &m.from).await {
                Ok(false) => {}
                Ok(true) => {
                    tracing::error!(
                        "Cannot restore {}/{}: name is taken, left as {}",
                        collection,
                        m.from,
                        temp
                    );
                    continue;
                }
                Err(e) => {
                    tracing::error!("Cannot restore {}/{}: {:#}", collection, m.from, e);
                    continue;
                }
            }
            match self.backend.rename(collection, temp, &m.from).await {
                Ok(()) => tracing::warn!("Restored {}/{} after failed renumbering", collection, m.from),
                Err(e) => tracing::error!("Cannot restore {}/{}: {:#}", collection, m.from, e),
            }
        }
    }

    async fn rename(&self, collection: &str, from: &str, to: &str) -> CatalogResult<()> {
        self.backend
            .rename(collection, from, to)
            .await
            .map_err(CatalogError::storage)
    }

    /// Scan and reshape into the published document, writing it to the
    /// configured manifest path when there is one.
    pub async fn generate_manifest(&self) -> CatalogResult<ManifestDocument> {
        let scan = self.scan().await?;
        let manifest = ManifestDocument::from_scan(&scan);

        if let Some(path) = &self.manifest_path {
            let json = manifest
                .to_json()
                .map_err(|e| CatalogError::Unknown(e.to_string()))?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    CatalogError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
            tokio::fs::write(path, json).await.map_err(|e| {
                CatalogError::Storage(format!("Failed to write {}: {e}", path.display()))
            })?;
            tracing::info!("Manifest written to {}", path.display());
        }

        Ok(manifest)
    }

    /// Raw bytes of a stored image, `None` when it does not exist.
    pub async fn read_image(&self, collection: &str, filename: &str) -> CatalogResult<Option<Vec<u8>>> {
        self.collection(collection)?;
        naming::check_filename(filename)?;
        self.backend
            .get(collection, filename)
            .await
            .map_err(CatalogError::storage)
    }
}
