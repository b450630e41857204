use serde::{Deserialize, Serialize};

/// Identifier of the singleton featured-image collection.
pub const HERO: &str = "hero";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
}

impl Collection {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    pub fn is_hero(&self) -> bool {
        self.id == HERO
    }
}

/// The closed set of collections a catalog serves.
///
/// Built once and handed to the service; there is no way to add a
/// collection to a running catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSet {
    collections: Vec<Collection>,
}

impl CollectionSet {
    /// Build a set from the given collections. Duplicate ids keep their
    /// first occurrence and `hero` is appended when missing.
    pub fn new(collections: Vec<Collection>) -> Self {
        let mut unique: Vec<Collection> = Vec::with_capacity(collections.len() + 1);
        for collection in collections {
            if !unique.iter().any(|c| c.id == collection.id) {
                unique.push(collection);
            }
        }
        if !unique.iter().any(Collection::is_hero) {
            unique.push(Collection::new(HERO, "Image Principale"));
        }
        Self { collections: unique }
    }

    pub fn get(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(|c| c.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

impl Default for CollectionSet {
    fn default() -> Self {
        Self::new(vec![
            Collection::new("costumes", "Costumes sur Mesure"),
            Collection::new("chemises", "Chemises sur Mesure"),
            Collection::new("pantalons", "Pantalons sur Mesure"),
            Collection::new("vestes", "Vestes & Blazers"),
            Collection::new("tenues", "Tenues Spécifiques"),
            Collection::new("accessoires", "Accessoires Masculins"),
            Collection::new(HERO, "Image Principale"),
        ])
    }
}
