use std::path::PathBuf;

use anyhow::Result;

use super::open_catalog;

pub async fn execute(local: Option<PathBuf>, collection: String, filename: String) -> Result<()> {
    tracing::info!("Deleting {}/{}", collection, filename);

    let catalog = open_catalog(local).await?;
    let outcome = catalog.delete(&collection, &filename).await?;

    if !outcome.found {
        println!("Nothing to delete: {collection}/{filename} does not exist");
        return Ok(());
    }

    println!("✓ Deleted {collection}/{filename}");
    for rename in &outcome.renamed {
        println!("  {} -> {}", rename.from, rename.to);
    }

    Ok(())
}
