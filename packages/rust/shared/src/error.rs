//! Error types for catalogsearch.
//!
//! Every library crate reports failures through [`CatalogSearchError`] via
//! `thiserror`. A product with no joined rows is never an error; the augmenter
//! handles that with default fields.

use std::path::PathBuf;

/// Top-level error type for all catalogsearch operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogSearchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The underlying bulk lookup failed (connectivity, SQL, row decoding).
    #[error("data source unavailable: {0}")]
    DataSource(String),

    /// An aggregated per-product field could not be decoded.
    #[error("malformed aggregate for product {product_id}: {message}")]
    MalformedAggregate { product_id: u64, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (bad ids, bad prefix, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CatalogSearchError>;

impl CatalogSearchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a data source error from any displayable message.
    pub fn data_source(msg: impl std::fmt::Display) -> Self {
        Self::DataSource(msg.to_string())
    }

    /// Create a malformed-aggregate error for one product.
    pub fn malformed_aggregate(product_id: u64, msg: impl Into<String>) -> Self {
        Self::MalformedAggregate {
            product_id,
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
