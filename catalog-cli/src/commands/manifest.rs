use std::path::PathBuf;

use anyhow::Result;

use super::open_catalog;

pub async fn execute(local: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let catalog = open_catalog(local).await?;
    let catalog = match &output {
        Some(path) => catalog.with_manifest_path(Some(path.clone())),
        None => catalog,
    };

    let manifest = catalog.generate_manifest().await?;

    match output {
        Some(path) => {
            let total: usize = manifest.collections.values().map(|c| c.count).sum();
            println!("✓ Manifest written to {}", path.display());
            println!("Collections: {}", manifest.collections.len());
            println!("Images: {}", total);
            println!("Hero: {}", if manifest.hero.is_some() { "yes" } else { "none" });
        }
        None => println!("{}", manifest.to_json()?),
    }

    Ok(())
}
