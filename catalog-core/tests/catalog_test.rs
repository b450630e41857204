//! Catalog behaviour against the local filesystem backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use catalog_core::{
    CatalogError, CatalogService, CollectionSet, LocalBackend, StorageBackend, StoredObject,
    UploadPolicy, HERO, MAX_UPLOAD_BYTES,
};
use tempfile::TempDir;

fn catalog() -> (TempDir, CatalogService) {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(LocalBackend::new(dir.path()));
    let service = CatalogService::new(CollectionSet::default(), UploadPolicy::default(), backend);
    (dir, service)
}

async fn filenames(service: &CatalogService, collection: &str) -> Vec<String> {
    let scan = service.scan().await.unwrap();
    scan.collections[collection]
        .images
        .iter()
        .map(|image| image.filename.clone())
        .collect()
}

fn files_on_disk(dir: &TempDir, collection: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path().join(collection))
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn upload_then_delete_compacts_sequence() {
    let (dir, catalog) = catalog();

    let first = catalog.upload("chemises", "a.jpg", b"aaaa".to_vec()).await.unwrap();
    let second = catalog.upload("chemises", "b.png", b"bb".to_vec()).await.unwrap();
    assert_eq!(first.filename, "1.jpg");
    assert_eq!(first.url, "/uploads/chemises/1.jpg");
    assert_eq!(first.size, 4);
    assert_eq!(second.filename, "2.png");

    let outcome = catalog.delete("chemises", "1.jpg").await.unwrap();
    assert!(outcome.found);
    assert_eq!(outcome.renamed.len(), 1);
    assert_eq!(outcome.renamed[0].from, "2.png");
    assert_eq!(outcome.renamed[0].to, "1.png");

    let scan = catalog.scan().await.unwrap();
    let chemises = &scan.collections["chemises"];
    assert_eq!(chemises.count, 1);
    assert_eq!(chemises.images[0].filename, "1.png");
    assert_eq!(chemises.images[0].size, 2);
    assert_eq!(files_on_disk(&dir, "chemises"), vec!["1.png"]);
}

#[tokio::test]
async fn delete_in_the_middle_keeps_order_and_extensions() {
    let (_dir, catalog) = catalog();
    for hint in ["a.jpg", "b.png", "c.webp", "d.jpeg"] {
        catalog.upload("vestes", hint, vec![1]).await.unwrap();
    }

    catalog.delete("vestes", "2.png").await.unwrap();

    assert_eq!(
        filenames(&catalog, "vestes").await,
        vec!["1.jpg", "2.webp", "3.jpeg"]
    );
}

#[tokio::test]
async fn listing_and_compaction_order_numerically_past_nine() {
    let (_dir, catalog) = catalog();
    for i in 0..12 {
        catalog
            .upload("costumes", "photo.jpg", vec![i as u8 + 1])
            .await
            .unwrap();
    }
    let names = filenames(&catalog, "costumes").await;
    assert_eq!(names[8], "9.jpg");
    assert_eq!(names[9], "10.jpg");
    assert_eq!(names[11], "12.jpg");

    catalog.delete("costumes", "3.jpg").await.unwrap();

    let expected: Vec<String> = (1..=11).map(|n| format!("{n}.jpg")).collect();
    assert_eq!(filenames(&catalog, "costumes").await, expected);
    // 10.jpg held the tenth upload and is now 9.jpg.
    assert_eq!(
        catalog.read_image("costumes", "9.jpg").await.unwrap().unwrap(),
        vec![10]
    );
}

#[tokio::test]
async fn delete_of_missing_file_is_a_noop() {
    let (_dir, catalog) = catalog();
    catalog.upload("tenues", "a.jpg", vec![1]).await.unwrap();
    catalog.upload("tenues", "b.jpg", vec![2]).await.unwrap();

    let outcome = catalog.delete("tenues", "7.jpg").await.unwrap();

    assert!(!outcome.found);
    assert!(outcome.renamed.is_empty());
    assert_eq!(filenames(&catalog, "tenues").await, vec!["1.jpg", "2.jpg"]);
}

#[tokio::test]
async fn hero_upload_overwrites_single_image() {
    let (dir, catalog) = catalog();

    catalog.upload(HERO, "banner.jpg", b"old".to_vec()).await.unwrap();
    let latest = catalog.upload(HERO, "Banner2.JPG", b"newest".to_vec()).await.unwrap();

    assert_eq!(latest.filename, "hero.jpg");
    assert_eq!(files_on_disk(&dir, HERO), vec!["hero.jpg"]);
    assert_eq!(
        catalog.read_image(HERO, "hero.jpg").await.unwrap().unwrap(),
        b"newest"
    );
}

#[tokio::test]
async fn hero_with_new_extension_replaces_previous_file() {
    let (dir, catalog) = catalog();

    catalog.upload(HERO, "banner.jpg", vec![1]).await.unwrap();
    catalog.upload(HERO, "banner.png", vec![2]).await.unwrap();

    assert_eq!(files_on_disk(&dir, HERO), vec!["hero.png"]);
    assert_eq!(filenames(&catalog, HERO).await, vec!["hero.png"]);
}

#[tokio::test]
async fn hero_delete_does_not_renumber() {
    let (dir, catalog) = catalog();
    catalog.upload(HERO, "banner.webp", vec![1]).await.unwrap();

    let outcome = catalog.delete(HERO, "hero.webp").await.unwrap();

    assert!(outcome.found);
    assert!(outcome.renamed.is_empty());
    assert!(files_on_disk(&dir, HERO).is_empty());
}

#[tokio::test]
async fn unsupported_format_creates_nothing() {
    let (dir, catalog) = catalog();

    let err = catalog
        .upload("accessoires", "scan.bmp", vec![1, 2, 3])
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::UnsupportedFormat(_)));
    assert!(files_on_disk(&dir, "accessoires").is_empty());
}

#[tokio::test]
async fn oversized_upload_creates_nothing() {
    let (dir, catalog) = catalog();

    let err = catalog
        .upload("pantalons", "big.jpg", vec![0; MAX_UPLOAD_BYTES + 1])
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::PayloadTooLarge { .. }));
    assert!(files_on_disk(&dir, "pantalons").is_empty());
}

#[tokio::test]
async fn upload_validates_collection_and_input() {
    let (_dir, catalog) = catalog();

    assert!(matches!(
        catalog.upload("chaussures", "a.jpg", vec![1]).await,
        Err(CatalogError::InvalidCollection(_))
    ));
    assert!(matches!(
        catalog.upload("vestes", "a.jpg", Vec::new()).await,
        Err(CatalogError::EmptyInput)
    ));
    assert!(matches!(
        catalog.upload("vestes", "", vec![1]).await,
        Err(CatalogError::EmptyInput)
    ));
}

#[tokio::test]
async fn gif_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = CatalogService::new(
        CollectionSet::default(),
        UploadPolicy::new(false, MAX_UPLOAD_BYTES),
        Arc::new(LocalBackend::new(dir.path())),
    );

    assert!(matches!(
        catalog.upload("vestes", "anim.gif", vec![1]).await,
        Err(CatalogError::UnsupportedFormat(_))
    ));
}

#[tokio::test]
async fn name_collision_falls_back_to_suffix() {
    let (dir, catalog) = catalog();
    // A stray non-image file does not count toward the sequence but still
    // blocks its name.
    std::fs::create_dir_all(dir.path().join("vestes")).unwrap();
    std::fs::write(dir.path().join("vestes").join("notes.txt"), b"x").unwrap();
    std::fs::write(dir.path().join("vestes").join("2.jpg"), b"x").unwrap();

    let uploaded = catalog.upload("vestes", "a.jpg", vec![1]).await.unwrap();

    assert_eq!(uploaded.filename, "2_1.jpg");
}

#[tokio::test]
async fn replace_keeps_name_and_swaps_bytes() {
    let (_dir, catalog) = catalog();
    catalog.upload("vestes", "a.jpg", b"before".to_vec()).await.unwrap();
    catalog.upload("vestes", "b.jpg", b"other".to_vec()).await.unwrap();

    let replaced = catalog
        .replace("vestes", "1.jpg", b"after!!".to_vec(), Some("new.jpg"))
        .await
        .unwrap();

    assert_eq!(replaced.filename, "1.jpg");
    assert_eq!(replaced.size, 7);
    assert_eq!(filenames(&catalog, "vestes").await, vec!["1.jpg", "2.jpg"]);
    assert_eq!(
        catalog.read_image("vestes", "1.jpg").await.unwrap().unwrap(),
        b"after!!"
    );
}

#[tokio::test]
async fn replace_of_missing_image_is_not_found() {
    let (dir, catalog) = catalog();

    let err = catalog
        .replace("vestes", "4.jpg", vec![1], None)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::NotFound { .. }));
    assert!(files_on_disk(&dir, "vestes").is_empty());
}

#[tokio::test]
async fn replace_rejects_unsupported_source() {
    let (_dir, catalog) = catalog();
    catalog.upload("vestes", "a.jpg", vec![1]).await.unwrap();

    assert!(matches!(
        catalog.replace("vestes", "1.jpg", vec![2], Some("scan.tiff")).await,
        Err(CatalogError::UnsupportedFormat(_))
    ));
}

#[tokio::test]
async fn traversal_filenames_are_refused() {
    let (_dir, catalog) = catalog();

    assert!(matches!(
        catalog.delete("vestes", "../hero/hero.jpg").await,
        Err(CatalogError::InvalidFilename(_))
    ));
    assert!(matches!(
        catalog.read_image("vestes", "../../etc/passwd").await,
        Err(CatalogError::InvalidFilename(_))
    ));
}

#[tokio::test]
async fn scan_reports_every_collection_including_empty_hero() {
    let (_dir, catalog) = catalog();
    catalog.upload("chemises", "a.jpg", vec![1, 2]).await.unwrap();

    let scan = catalog.scan().await.unwrap();

    assert_eq!(scan.collections.len(), 7);
    assert_eq!(scan.stats.collections_count, 7);
    assert_eq!(scan.stats.total_images, 1);
    assert_eq!(scan.collections[HERO].count, 0);
    assert_eq!(scan.collections["chemises"].title, "Chemises sur Mesure");
    assert!(scan.collections["chemises"].images[0].modified.is_some());
}

#[tokio::test]
async fn manifest_matches_scan() {
    let (_dir, catalog) = catalog();
    catalog.upload("chemises", "a.jpg", vec![1]).await.unwrap();
    catalog.upload("chemises", "b.jpg", vec![1]).await.unwrap();
    catalog.upload("vestes", "a.png", vec![1]).await.unwrap();

    let scan = catalog.scan().await.unwrap();
    let manifest = catalog.generate_manifest().await.unwrap();

    for (id, listing) in scan.collections.iter().filter(|(id, _)| id.as_str() != HERO) {
        assert_eq!(manifest.collections[id].count, listing.count, "{id}");
    }
    let value = serde_json::to_value(&manifest).unwrap();
    assert_eq!(value["hero"], serde_json::json!({}));
    assert_eq!(value["collections"]["chemises"]["images"][1]["number"], "2");

    catalog.upload(HERO, "banner.jpg", vec![1]).await.unwrap();
    let scan = catalog.scan().await.unwrap();
    let manifest = catalog.generate_manifest().await.unwrap();
    assert_eq!(manifest.hero.unwrap().url, scan.hero().unwrap().url);
}

#[tokio::test]
async fn manifest_is_written_when_path_configured() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("site").join("data").join("collections.json");
    let catalog = CatalogService::new(
        CollectionSet::default(),
        UploadPolicy::default(),
        Arc::new(LocalBackend::new(dir.path().join("uploads"))),
    )
    .with_manifest_path(Some(output.clone()));
    catalog.upload("vestes", "a.jpg", vec![1]).await.unwrap();

    catalog.generate_manifest().await.unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
    assert_eq!(written["collections"]["vestes"]["count"], 1);
    assert!(written["last_updated"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deletes_leave_contiguous_sequence() {
    let (_dir, catalog) = catalog();
    let catalog = Arc::new(catalog);
    for _ in 0..10 {
        catalog.upload("costumes", "a.jpg", vec![1]).await.unwrap();
    }

    // Every task deletes "1.jpg"; each one that finds it triggers a full
    // compaction, so exactly four files must disappear.
    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let catalog = catalog.clone();
            tokio::spawn(async move { catalog.delete("costumes", "1.jpg").await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().unwrap().found);
    }

    let expected: Vec<String> = (1..=6).map(|n| format!("{n}.jpg")).collect();
    assert_eq!(filenames(&catalog, "costumes").await, expected);
}

struct UnavailableBackend;

#[async_trait]
impl StorageBackend for UnavailableBackend {
    fn kind(&self) -> &'static str {
        "unavailable"
    }

    async fn list(&self, _collection: &str) -> Result<Vec<StoredObject>> {
        anyhow::bail!("connection timed out")
    }

    async fn put(&self, _collection: &str, _filename: &str, _data: Vec<u8>) -> Result<StoredObject> {
        anyhow::bail!("connection timed out")
    }

    async fn get(&self, _collection: &str, _filename: &str) -> Result<Option<Vec<u8>>> {
        anyhow::bail!("connection timed out")
    }

    async fn exists(&self, _collection: &str, _filename: &str) -> Result<bool> {
        anyhow::bail!("connection timed out")
    }

    async fn remove(&self, _collection: &str, _filename: &str) -> Result<bool> {
        anyhow::bail!("connection timed out")
    }

    async fn rename(&self, _collection: &str, _from: &str, _to: &str) -> Result<()> {
        anyhow::bail!("connection timed out")
    }

    fn public_url(&self, collection: &str, filename: &str) -> String {
        format!("/{collection}/{filename}")
    }
}

#[tokio::test]
async fn backend_failures_surface_as_storage_errors() {
    let catalog = CatalogService::new(
        CollectionSet::default(),
        UploadPolicy::default(),
        Arc::new(UnavailableBackend),
    );

    let err = catalog.scan().await.unwrap_err();
    assert!(matches!(&err, CatalogError::Storage(msg) if msg.contains("timed out")));

    let err = catalog.delete("vestes", "1.jpg").await.unwrap_err();
    assert!(matches!(err, CatalogError::Storage(_)));

    // Validation still runs before the backend is touched.
    assert!(matches!(
        catalog.upload("vestes", "a.bmp", vec![1]).await,
        Err(CatalogError::UnsupportedFormat(_))
    ));
}

/// Local storage with switchable failures.
struct FlakyBackend {
    inner: LocalBackend,
    fail_put: AtomicBool,
    fail_rename_to: Mutex<Option<String>>,
}

impl FlakyBackend {
    fn new(dir: &TempDir) -> Self {
        Self {
            inner: LocalBackend::new(dir.path()),
            fail_put: AtomicBool::new(false),
            fail_rename_to: Mutex::new(None),
        }
    }
}

#[async_trait]
impl StorageBackend for FlakyBackend {
    fn kind(&self) -> &'static str {
        "flaky"
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredObject>> {
        self.inner.list(collection).await
    }

    async fn put(&self, collection: &str, filename: &str, data: Vec<u8>) -> Result<StoredObject> {
        if self.fail_put.load(Ordering::SeqCst) {
            anyhow::bail!("put timeout");
        }
        self.inner.put(collection, filename, data).await
    }

    async fn get(&self, collection: &str, filename: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(collection, filename).await
    }

    async fn exists(&self, collection: &str, filename: &str) -> Result<bool> {
        self.inner.exists(collection, filename).await
    }

    async fn remove(&self, collection: &str, filename: &str) -> Result<bool> {
        self.inner.remove(collection, filename).await
    }

    async fn rename(&self, collection: &str, from: &str, to: &str) -> Result<()> {
        let fail = self.fail_rename_to.lock().unwrap().as_deref() == Some(to);
        if fail {
            anyhow::bail!("rename timeout");
        }
        self.inner.rename(collection, from, to).await
    }

    fn public_url(&self, collection: &str, filename: &str) -> String {
        self.inner.public_url(collection, filename)
    }
}

fn flaky_catalog() -> (TempDir, Arc<FlakyBackend>, CatalogService) {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FlakyBackend::new(&dir));
    let service = CatalogService::new(
        CollectionSet::default(),
        UploadPolicy::default(),
        backend.clone(),
    );
    (dir, backend, service)
}

#[tokio::test]
async fn failed_hero_upload_keeps_previous_hero() {
    let (dir, backend, catalog) = flaky_catalog();
    catalog.upload(HERO, "a.jpg", b"old".to_vec()).await.unwrap();

    backend.fail_put.store(true, Ordering::SeqCst);
    let err = catalog.upload(HERO, "b.png", b"new".to_vec()).await.unwrap_err();

    assert!(matches!(&err, CatalogError::Storage(msg) if msg.contains("put timeout")));
    assert_eq!(filenames(&catalog, HERO).await, vec!["hero.jpg"]);
    assert_eq!(files_on_disk(&dir, HERO), vec!["hero.jpg"]);
    assert_eq!(
        catalog.read_image(HERO, "hero.jpg").await.unwrap().unwrap(),
        b"old"
    );
}

#[tokio::test]
async fn failed_renumbering_leaves_images_visible() {
    let (dir, backend, catalog) = flaky_catalog();
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        catalog.upload("vestes", name, b"x".to_vec()).await.unwrap();
    }

    *backend.fail_rename_to.lock().unwrap() = Some("2.jpg".to_string());
    let err = catalog.delete("vestes", "1.jpg").await.unwrap_err();

    assert!(matches!(&err, CatalogError::Storage(msg) if msg.contains("rename timeout")));
    assert_eq!(filenames(&catalog, "vestes").await, vec!["1.jpg", "3.jpg"]);
    assert_eq!(files_on_disk(&dir, "vestes"), vec!["1.jpg", "3.jpg"]);

    // The next compaction closes the gap.
    *backend.fail_rename_to.lock().unwrap() = None;
    catalog.upload("vestes", "d.jpg", b"x".to_vec()).await.unwrap();
    catalog.delete("vestes", "1.jpg").await.unwrap();
    assert_eq!(filenames(&catalog, "vestes").await, vec!["1.jpg", "2.jpg"]);
}
