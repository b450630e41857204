//! Storage backends.
//!
//! A backend only knows about `(collection, filename)` pairs and raw bytes.
//! Naming policy, validation and locking live in [`crate::CatalogService`].

mod local;
mod s3;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use local::LocalBackend;
pub use s3::{S3Backend, S3Settings};

/// One object as reported by a backend listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub filename: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Backend-assigned identifier (relative path or object key).
    pub asset_id: String,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short name reported by the health endpoint.
    fn kind(&self) -> &'static str;

    /// Every object in a collection, in no particular order.
    async fn list(&self, collection: &str) -> Result<Vec<StoredObject>>;

    /// Write `data`, replacing any object with the same name in one step.
    async fn put(&self, collection: &str, filename: &str, data: Vec<u8>) -> Result<StoredObject>;

    /// Read an object, `None` when it does not exist.
    async fn get(&self, collection: &str, filename: &str) -> Result<Option<Vec<u8>>>;

    async fn exists(&self, collection: &str, filename: &str) -> Result<bool>;

    /// Remove an object. Returns `false` when there was nothing to remove.
    async fn remove(&self, collection: &str, filename: &str) -> Result<bool>;

    /// Move `from` to `to` within a collection, overwriting `to`.
    async fn rename(&self, collection: &str, from: &str, to: &str) -> Result<()>;

    /// URL under which the frontend can fetch the object.
    fn public_url(&self, collection: &str, filename: &str) -> String;
}
