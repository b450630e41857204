use anyhow::{Context, Result};
use catalog_core::{naming, UploadPolicy, HERO};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::open_catalog;

pub async fn execute(local: Option<PathBuf>, paths: Vec<PathBuf>, collection: String) -> Result<()> {
    let catalog = open_catalog(local).await?;
    if !catalog.collections().contains(&collection) {
        let valid: Vec<&str> = catalog.collections().ids().collect();
        anyhow::bail!(
            "Unknown collection: {collection} (valid: {})",
            valid.join(", ")
        );
    }

    let image_paths = collect_image_paths(&paths, catalog.policy())?;

    if image_paths.is_empty() {
        anyhow::bail!("No images found in the provided paths");
    }
    if collection == HERO && image_paths.len() > 1 {
        anyhow::bail!(
            "The hero collection holds a single image, got {} files",
            image_paths.len()
        );
    }

    println!("Collection: {}", collection);
    println!("Images to upload: {}\n", image_paths.len());

    let upload_pb = ProgressBar::new(image_paths.len() as u64);
    upload_pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.green/blue} {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("█▓▒░ "),
    );
    upload_pb.set_message("Uploading...");

    // Sequential so numbering follows file order.
    let mut uploaded = Vec::with_capacity(image_paths.len());
    for path in &image_paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let hint = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let image = catalog.upload(&collection, &hint, data).await?;
        upload_pb.inc(1);
        upload_pb.set_message(format!("{} -> {}", hint, image.filename));
        uploaded.push((hint, image));
    }
    upload_pb.finish_with_message("All images uploaded");
    println!();

    for (hint, image) in &uploaded {
        println!("  {} -> {} ({} bytes)", hint, image.url, image.size);
    }
    println!("\n✓ Uploaded {} images to {}", uploaded.len(), collection);

    Ok(())
}

/// Expand files and directories into the list of accepted image files.
fn collect_image_paths(paths: &[PathBuf], policy: &UploadPolicy) -> Result<Vec<PathBuf>> {
    let is_image = |path: &Path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| policy.is_image(name))
    };

    let mut image_paths = Vec::new();

    for path in paths {
        if !path.exists() {
            anyhow::bail!("Path does not exist: {}", path.display());
        }

        if path.is_file() {
            if is_image(path.as_path()) {
                image_paths.push(path.to_path_buf());
            } else {
                tracing::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file() && is_image(entry_path) {
                    found.push(entry_path.to_path_buf());
                }
            }
            // Directory contents upload in numeric-aware name order.
            found.sort_by(|a, b| {
                naming::compare_names(&a.to_string_lossy(), &b.to_string_lossy())
            });
            image_paths.extend(found);
        }
    }

    Ok(image_paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_walked_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2.jpg", "10.jpg", "1.png", "notes.txt", "scan.bmp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let paths = collect_image_paths(&[dir.path().to_path_buf()], &UploadPolicy::default()).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["1.png", "2.jpg", "10.jpg"]);
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        assert!(collect_image_paths(&[missing], &UploadPolicy::default()).is_err());
    }
}
