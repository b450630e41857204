use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::collections::HERO;
use crate::naming;

/// One image as reported by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub filename: String,
    pub url: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionListing {
    pub title: String,
    pub images: Vec<ImageEntry>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub total_images: usize,
    pub collections_count: usize,
}

/// Result of `GET /api/scan`: every collection, including an empty hero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub collections: BTreeMap<String, CollectionListing>,
    pub stats: ScanStats,
}

impl ScanReport {
    pub fn new() -> Self {
        Self {
            collections: BTreeMap::new(),
            stats: ScanStats {
                total_images: 0,
                collections_count: 0,
            },
        }
    }

    pub fn add_collection(&mut self, id: &str, title: &str, images: Vec<ImageEntry>) {
        self.stats.total_images += images.len();
        self.stats.collections_count += 1;
        self.collections.insert(
            id.to_string(),
            CollectionListing {
                title: title.to_string(),
                count: images.len(),
                images,
            },
        );
    }

    pub fn hero(&self) -> Option<&ImageEntry> {
        self.collections
            .get(HERO)
            .and_then(|listing| listing.images.first())
    }
}

impl Default for ScanReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeroImage {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestImage {
    pub url: String,
    pub filename: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestCollection {
    pub title: String,
    pub images: Vec<ManifestImage>,
    pub count: usize,
}

/// The document published for the static site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestDocument {
    pub last_updated: String,
    #[serde(serialize_with = "hero_or_empty")]
    pub hero: Option<HeroImage>,
    pub collections: BTreeMap<String, ManifestCollection>,
}

impl ManifestDocument {
    /// Reshape a scan. The hero moves to its own field and every other
    /// image gets its filename stem as `number`.
    pub fn from_scan(scan: &ScanReport) -> Self {
        let hero = scan.hero().map(|image| HeroImage {
            url: image.url.clone(),
            filename: image.filename.clone(),
        });

        let collections = scan
            .collections
            .iter()
            .filter(|(id, _)| id.as_str() != HERO)
            .map(|(id, listing)| {
                let images = listing
                    .images
                    .iter()
                    .map(|image| ManifestImage {
                        url: image.url.clone(),
                        filename: image.filename.clone(),
                        number: naming::stem(&image.filename).to_string(),
                    })
                    .collect();
                (
                    id.clone(),
                    ManifestCollection {
                        title: listing.title.clone(),
                        images,
                        count: listing.count,
                    },
                )
            })
            .collect();

        Self {
            last_updated: chrono::Utc::now().to_rfc3339(),
            hero,
            collections,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn hero_or_empty<S: Serializer>(hero: &Option<HeroImage>, serializer: S) -> Result<S::Ok, S::Error> {
    match hero {
        Some(hero) => hero.serialize(serializer),
        None => BTreeMap::<String, String>::new().serialize(serializer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(collection: &str, filename: &str) -> ImageEntry {
        ImageEntry {
            filename: filename.to_string(),
            url: format!("/uploads/{collection}/{filename}"),
            size: 10,
            modified: None,
        }
    }

    #[test]
    fn missing_hero_serializes_as_empty_object() {
        let mut scan = ScanReport::new();
        scan.add_collection(HERO, "Image Principale", Vec::new());
        scan.add_collection("vestes", "Vestes & Blazers", vec![entry("vestes", "1.jpg")]);

        let value = serde_json::to_value(ManifestDocument::from_scan(&scan)).unwrap();
        assert_eq!(value["hero"], json!({}));
        assert!(value["collections"].get(HERO).is_none());
        assert_eq!(value["collections"]["vestes"]["count"], 1);
        assert_eq!(value["collections"]["vestes"]["images"][0]["number"], "1");
    }

    #[test]
    fn hero_is_lifted_out_of_collections() {
        let mut scan = ScanReport::new();
        scan.add_collection(HERO, "Image Principale", vec![entry(HERO, "hero.png")]);

        let manifest = ManifestDocument::from_scan(&scan);
        assert_eq!(
            manifest.hero,
            Some(HeroImage {
                url: "/uploads/hero/hero.png".to_string(),
                filename: "hero.png".to_string(),
            })
        );
        assert!(manifest.collections.is_empty());
    }

    #[test]
    fn scan_stats_track_totals() {
        let mut scan = ScanReport::new();
        scan.add_collection("chemises", "Chemises", vec![entry("chemises", "1.jpg"), entry("chemises", "2.jpg")]);
        scan.add_collection("vestes", "Vestes", vec![entry("vestes", "1.jpg")]);
        scan.add_collection(HERO, "Hero", Vec::new());

        assert_eq!(scan.stats.total_images, 3);
        assert_eq!(scan.stats.collections_count, 3);
        assert!(scan.hero().is_none());
    }
}
