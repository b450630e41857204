//! Filename rules for catalog images.
//!
//! Numbered collections store `{n}.{ext}` with `n` starting at 1, the hero
//! collection stores a single `hero.{ext}`. Everything here is pure string
//! work so that every backend applies the same policy.

use std::cmp::Ordering;
use std::path::Path;

use image::ImageFormat;

use crate::error::{CatalogError, CatalogResult};

/// Upload ceiling, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const BASE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Which files the catalog accepts and recognises as images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed_extensions: Vec<String>,
    max_bytes: usize,
}

impl UploadPolicy {
    pub fn new(allow_gif: bool, max_bytes: usize) -> Self {
        let mut allowed_extensions: Vec<String> =
            BASE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect();
        if allow_gif {
            allowed_extensions.push("gif".to_string());
        }
        Self {
            allowed_extensions,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn allows_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|allowed| *allowed == ext)
    }

    /// Whether a stored filename counts as a catalog image.
    pub fn is_image(&self, filename: &str) -> bool {
        extension(filename).is_some_and(|ext| self.allows_extension(ext))
    }

    /// Validate an upload hint and return its lowercased extension.
    pub fn check_extension(&self, filename: &str) -> CatalogResult<String> {
        match extension(filename) {
            Some(ext) if self.allows_extension(ext) => Ok(ext.to_ascii_lowercase()),
            Some(ext) => Err(CatalogError::UnsupportedFormat(format!(
                ".{ext} (allowed: {})",
                self.allowed_extensions.join(", ")
            ))),
            None => Err(CatalogError::UnsupportedFormat(format!(
                "{filename} has no extension"
            ))),
        }
    }

    pub fn check_size(&self, size: usize) -> CatalogResult<()> {
        if size > self.max_bytes {
            return Err(CatalogError::PayloadTooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(true, MAX_UPLOAD_BYTES)
    }
}

/// Extension of a filename, without the dot and with its original case.
pub fn extension(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|ext| ext.to_str())
}

/// Filename without its extension. This is the `number` of a manifest entry.
pub fn stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Position encoded in a numbered filename, if any.
pub fn sequence_number(filename: &str) -> Option<u64> {
    stem(filename).parse().ok()
}

/// Listing order: numbered files ascending by number, then everything else
/// by name.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    match (sequence_number(a), sequence_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

pub fn sort_names<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| compare_names(name(a), name(b)));
}

/// Reject anything that could escape the collection directory or key prefix.
pub fn check_filename(filename: &str) -> CatalogResult<()> {
    if filename.is_empty() {
        return Err(CatalogError::EmptyInput);
    }
    let unsafe_name = filename.contains(['/', '\\', '\0'])
        || filename == "."
        || filename == ".."
        || filename.starts_with('.');
    if unsafe_name {
        return Err(CatalogError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

pub fn hero_filename(ext: &str) -> String {
    format!("{}.{ext}", crate::collections::HERO)
}

/// Pick `{next}.{ext}`, or the first free `{next}_{k}.{ext}` when taken.
pub fn next_sequence_name<'a>(
    next: usize,
    ext: &str,
    existing: impl IntoIterator<Item = &'a str> + Clone,
) -> String {
    let taken = |candidate: &str| existing.clone().into_iter().any(|name| name == candidate);

    let base = format!("{next}.{ext}");
    if !taken(&base) {
        return base;
    }
    (1..)
        .map(|k| format!("{next}_{k}.{ext}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}

/// MIME type for a stored filename.
pub fn content_type(filename: &str) -> &'static str {
    match extension(filename) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => "application/json",
        Some(ext) => ImageFormat::from_extension(ext.to_ascii_lowercase())
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream"),
        None => "application/octet-stream",
    }
}
