use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream, Client};
use chrono::{DateTime, Utc};

use super::{StorageBackend, StoredObject};
use crate::naming::content_type;

/// Connection settings for the hosted bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    /// Key prefix inside the bucket, e.g. `catalog/`.
    pub prefix: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
    /// S3-compatible endpoint (MinIO, R2, ...).
    pub endpoint_url: Option<String>,
    /// Base for public image URLs, defaults to the bucket's S3 host.
    pub public_url: Option<String>,
}

/// Objects live at `{prefix}{collection}/{filename}`; the object key is the
/// asset id reported back to callers.
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
    prefix: String,
    public_base: String,
}

impl S3Backend {
    pub async fn new(settings: S3Settings) -> Result<Self> {
        let credentials = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "catalog-env",
        );
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials);

        if let Some(region) = &settings.region {
            config_loader = config_loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &settings.endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint_url);
        }

        let config = config_loader.load().await;
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&config);

        // S3-compatible services need path-style addressing
        if settings.endpoint_url.is_some() {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());
        let public_base = settings
            .public_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", settings.bucket));

        Ok(Self {
            client,
            prefix: normalize_prefix(&settings.prefix),
            bucket: settings.bucket,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    fn key(&self, collection: &str, filename: &str) -> String {
        format!("{}{collection}/{filename}", self.prefix)
    }

    fn collection_prefix(&self, collection: &str) -> String {
        format!("{}{collection}/", self.prefix)
    }

    async fn upload_bytes(&self, data: Vec<u8>, s3_key: &str) -> Result<()> {
        tracing::debug!(
            "S3 PUT: bucket={}, key={}, size={} bytes",
            self.bucket,
            s3_key,
            data.len()
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(s3_key)
            .body(ByteStream::from(data))
            .content_type(content_type(s3_key))
            .send()
            .await
            .with_context(|| format!("Failed to upload {s3_key}"))?;

        tracing::debug!("S3 PUT success: key={}", s3_key);
        Ok(())
    }

    async fn head(&self, s3_key: &str) -> Result<Option<StoredObject>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(s3_key)
            .send()
            .await
        {
            Ok(head) => {
                let filename = s3_key.rsplit('/').next().unwrap_or(s3_key).to_string();
                Ok(Some(StoredObject {
                    filename,
                    size: head.content_length().unwrap_or_default().max(0) as u64,
                    modified: head.last_modified().and_then(to_chrono),
                    asset_id: s3_key.to_string(),
                }))
            }
            Err(e) if e.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to inspect {s3_key}")),
        }
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn kind(&self) -> &'static str {
        "s3"
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredObject>> {
        let prefix = self.collection_prefix(collection);
        tracing::debug!("S3 LIST: bucket={}, prefix={}", self.bucket, prefix);

        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .with_context(|| format!("Failed to list objects under {prefix}"))?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                let Some(filename) = collection_filename(key, &prefix) else { continue };
                objects.push(StoredObject {
                    filename: filename.to_string(),
                    size: object.size().unwrap_or_default().max(0) as u64,
                    modified: object.last_modified().and_then(to_chrono),
                    asset_id: key.to_string(),
                });
            }

            continuation = next_page(page.is_truncated(), page.next_continuation_token());
            if continuation.is_none() {
                break;
            }
        }

        Ok(objects)
    }

    async fn put(&self, collection: &str, filename: &str, data: Vec<u8>) -> Result<StoredObject> {
        let key = self.key(collection, filename);
        let size = data.len() as u64;
        self.upload_bytes(data, &key).await?;

        Ok(self.head(&key).await?.unwrap_or(StoredObject {
            filename: filename.to_string(),
            size,
            modified: Some(Utc::now()),
            asset_id: key,
        }))
    }

    async fn get(&self, collection: &str, filename: &str) -> Result<Option<Vec<u8>>> {
        let key = self.key(collection, filename);
        tracing::debug!("S3 GET: bucket={}, key={}", self.bucket, key);

        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Ok(None)
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to download {key}")),
        };

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read S3 object body")?;

        let bytes = data.to_vec();
        tracing::debug!("S3 GET success: key={}, size={} bytes", key, bytes.len());
        Ok(Some(bytes))
    }

    async fn exists(&self, collection: &str, filename: &str) -> Result<bool> {
        Ok(self.head(&self.key(collection, filename)).await?.is_some())
    }

    async fn remove(&self, collection: &str, filename: &str) -> Result<bool> {
        let key = self.key(collection, filename);
        // DeleteObject succeeds for missing keys, so look first.
        if self.head(&key).await?.is_none() {
            return Ok(false);
        }

        tracing::debug!("S3 DELETE: bucket={}, key={}", self.bucket, key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .with_context(|| format!("Failed to delete {key}"))?;
        Ok(true)
    }

    async fn rename(&self, collection: &str, from: &str, to: &str) -> Result<()> {
        let source = self.key(collection, from);
        let target = self.key(collection, to);
        tracing::debug!("S3 COPY: bucket={}, {} -> {}", self.bucket, source, target);

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(copy_source(&self.bucket, &source))
            .key(&target)
            .content_type(content_type(&target))
            .metadata_directive(aws_sdk_s3::types::MetadataDirective::Replace)
            .send()
            .await
            .with_context(|| format!("Failed to copy {source} to {target}"))?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&source)
            .send()
            .await
            .with_context(|| format!("Failed to delete {source} after copy"))?;
        Ok(())
    }

    fn public_url(&self, collection: &str, filename: &str) -> String {
        format!("{}/{}", self.public_base, self.key(collection, filename))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Filename of an object directly under `prefix`. Keys in nested
/// "folders" do not belong to the collection.
fn collection_filename<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)
        .filter(|filename| !filename.is_empty() && !filename.contains('/'))
}

fn next_page(is_truncated: Option<bool>, token: Option<&str>) -> Option<String> {
    match token {
        Some(token) if is_truncated.unwrap_or(false) => Some(token.to_string()),
        _ => None,
    }
}

/// `CopySource` value: bucket and key, each key segment percent-encoded.
fn copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<_> = key.split('/').map(urlencoding::encode).collect();
    format!("{}/{}", bucket, encoded.join("/"))
}

fn to_chrono(time: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}
