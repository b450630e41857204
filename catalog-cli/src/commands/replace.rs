use std::path::PathBuf;

use anyhow::{Context, Result};

use super::open_catalog;

pub async fn execute(
    local: Option<PathBuf>,
    collection: String,
    filename: String,
    file: PathBuf,
) -> Result<()> {
    let data = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let source_name = file.file_name().map(|name| name.to_string_lossy().into_owned());

    let catalog = open_catalog(local).await?;
    let image = catalog
        .replace(&collection, &filename, data, source_name.as_deref())
        .await?;

    println!("✓ Replaced {}/{} ({} bytes)", collection, image.filename, image.size);

    Ok(())
}
