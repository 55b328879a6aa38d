//! Error types for the storage layer.
//!
//! Every fallible library operation returns [`Result`]. The CLI wraps these
//! in `anyhow` at the binary edge.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Per-item validation failures, keyed by the item's position in the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub BTreeMap<usize, Vec<String>>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<&Vec<String>> {
        self.0.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &Vec<String>)> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (index, errors) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "item {}: {}", index, errors.join(", "))?;
        }
        Ok(())
    }
}

/// Unified storage error type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// One or more items failed validation; nothing was written.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// A field could not be coerced while cleaning an item.
    #[error("Invalid type for '{field}': {message}")]
    Type { field: String, message: String },

    /// Codec name not recognised.
    #[error("Unsupported compression codec '{0}' (expected gzip or xz)")]
    UnsupportedCodec(String),

    /// Codec could not be inferred from a file extension.
    #[error("Cannot detect compression codec for {}", .0.display())]
    CodecDetection(PathBuf),

    /// Writing a compressed archive failed.
    #[error("Compression failed for {}: {message}", .path.display())]
    Compression { path: PathBuf, message: String },

    /// Reading back a compressed archive failed.
    #[error("Decompression failed for {}: {message}", .path.display())]
    Decompression { path: PathBuf, message: String },

    /// Ingesting a canonical file into the index failed; nothing was committed.
    #[error("Failed to index {}: {message}", .path.display())]
    Index { path: PathBuf, message: String },

    /// Database error outside of file ingestion.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub fn type_error(field: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Type {
            field: field.into(),
            message: message.to_string(),
        }
    }

    pub fn compression(path: &Path, message: impl fmt::Display) -> Self {
        Self::Compression {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn decompression(path: &Path, message: impl fmt::Display) -> Self {
        Self::Decompression {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn index(path: &Path, message: impl fmt::Display) -> Self {
        Self::Index {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
