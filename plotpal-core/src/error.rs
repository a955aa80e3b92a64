//! Error types for the plotpal-core crate.

use thiserror::Error;

/// Top-level error type for corpus construction.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),

    #[error("Tile error: {0}")]
    Tile(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Insufficient samples: need at least {required} {stage} samples, got {actual}")]
    InsufficientSamples {
        stage: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CorpusError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn projection(msg: impl Into<String>) -> Self {
        Self::Projection(msg.into())
    }

    pub fn tile(msg: impl Into<String>) -> Self {
        Self::Tile(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
