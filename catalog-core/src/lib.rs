pub mod collections;
pub mod config;
pub mod error;
pub mod manifest;
pub mod naming;
pub mod service;
pub mod storage;

pub use collections::{Collection, CollectionSet, HERO};
pub use config::{CatalogConfig, StorageConfig};
pub use error::{CatalogError, CatalogResult};
pub use manifest::{ImageEntry, ManifestDocument, ScanReport};
pub use naming::{UploadPolicy, MAX_UPLOAD_BYTES};
pub use service::{CatalogService, DeleteOutcome, ImageRef, Rename};
pub use storage::{LocalBackend, S3Backend, S3Settings, StorageBackend, StoredObject};
