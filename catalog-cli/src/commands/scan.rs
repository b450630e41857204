use std::path::PathBuf;

use anyhow::Result;

use super::open_catalog;

pub async fn execute(local: Option<PathBuf>, json: bool) -> Result<()> {
    let catalog = open_catalog(local).await?;
    let report = catalog.scan().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    // Print in configured collection order rather than map order.
    for collection in catalog.collections().iter() {
        let Some(listing) = report.collections.get(&collection.id) else {
            continue;
        };
        println!("{} ({}) - {} images", listing.title, collection.id, listing.count);
        for image in &listing.images {
            println!("  {:<12} {:>10} bytes  {}", image.filename, image.size, image.url);
        }
    }
    println!(
        "\nTotal: {} images in {} collections",
        report.stats.total_images, report.stats.collections_count
    );

    Ok(())
}
