//! Error types for catalog and configuration loading.

use std::path::PathBuf;

use shapecheck_core::SchemaDefinitionError;
use thiserror::Error;

/// Errors that can occur while loading schemas or configuration files.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A schema document could not be read into the schema model, or does
    /// not normalize.
    #[error("invalid schema \"{name}\": {source}")]
    InvalidSchema {
        name: String,
        #[source]
        source: SchemaDefinitionError,
    },

    /// A bundle file is not a mapping of names to schemas.
    #[error("invalid bundle {}: {reason}", path.display())]
    InvalidBundle { path: PathBuf, reason: String },

    /// Two files in one directory share a stem (`a.json` and `a.yaml`).
    #[error("schema \"{0}\" is defined more than once")]
    DuplicateName(String),

    /// All configured loader sources failed.
    #[error("no schema sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;
