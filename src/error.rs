use std::path::PathBuf;

use thiserror::Error;

use crate::core::dataset::GraspOutcome;

/// Result type for dataset, image and configuration operations
pub type Result<T> = std::result::Result<T, DataError>;

/// Error types for building and reading grasp datasets
#[derive(Error, Debug)]
pub enum DataError {
    /// Labels outside the two grasp classes were found
    #[error("Expected labels 0 (fail) and 1 (success), found {labels:?}")]
    InvalidLabelSet { labels: Vec<usize> },

    /// One of the two classes has no samples
    #[error("No samples for class '{outcome}'")]
    EmptyDataset { outcome: GraspOutcome },

    #[error("Index {index} out of range for subset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Camera message encoding we do not know how to decode
    #[error("Unsupported image encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("Buffer of {actual} bytes does not match {width}x{height} '{encoding}' image")]
    InvalidImageBuffer {
        width: u32,
        height: u32,
        encoding: String,
        actual: usize,
    },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// An RGB image without its depth counterpart
    #[error("Missing depth image for {0:?}")]
    MissingDepth(PathBuf),
}
