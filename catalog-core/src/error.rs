use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid collection: {0}")]
    InvalidCollection(String),

    #[error("No file provided")]
    EmptyInput,

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size} bytes (max {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Image not found: {collection}/{filename}")]
    NotFound { collection: String, filename: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Unknown(String),
}

impl CatalogError {
    /// Wrap a backend failure, keeping its whole context chain.
    pub fn storage(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }

    /// Whether the caller sent something the catalog refuses outright.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCollection(_)
                | Self::EmptyInput
                | Self::InvalidFilename(_)
                | Self::UnsupportedFormat(_)
                | Self::PayloadTooLarge { .. }
        )
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
