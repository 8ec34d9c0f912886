//! Error types shared by every stage of the processing pipelines.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, joining or exporting layers.
///
/// `Parse` is the only recoverable kind: the loader drops the offending row
/// and keeps going. Everything else aborts the run.
#[derive(Debug, Error)]
pub enum GeoJoinError {
    /// Malformed WKT or coordinate text.
    #[error("Failed to parse geometry: {0}")]
    Parse(String),

    /// Unknown CRS, failed transformation, or a distance operation outside a projected CRS.
    #[error("Projection error: {0}")]
    Projection(String),

    /// Missing input file or unwritable output.
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// Malformed CSV stream.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A configured column does not exist in the layer's schema.
    #[error("Layer '{layer}' has no column called '{column}'")]
    MissingColumn { layer: String, column: String },

    /// An operation would produce two columns with the same name.
    #[error("Column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GeoJoinError>;

impl GeoJoinError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GeoJoinError::Io {
            path: path.into(),
            source,
        }
    }
}
