//! JSON/YAML document files.
//!
//! Schemas, bundles, configuration files and input data may be written in
//! either format; the file extension decides which reader is used.

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// On-disk encoding of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Detects the format from the file extension.
    ///
    /// Returns `None` for anything other than `.json`, `.yaml` and `.yml`.
    ///
    /// # Examples
    ///
    /// ```
    /// use shapecheck_catalog::DocumentFormat;
    ///
    /// assert_eq!(DocumentFormat::from_path("a/user.yml"), Some(DocumentFormat::Yaml));
    /// assert_eq!(DocumentFormat::from_path("user.JSON"), Some(DocumentFormat::Json));
    /// assert_eq!(DocumentFormat::from_path("README.md"), None);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(DocumentFormat::Json),
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }
}

/// Reads a document, treating unknown extensions as JSON.
///
/// # Errors
///
/// Returns [`IoError`](crate::CatalogError::IoError) if the file cannot be
/// read, or a JSON/YAML error if it does not deserialize into `T`.
pub fn read_document<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let reader = BufReader::new(std::fs::File::open(path)?);
    match DocumentFormat::from_path(path).unwrap_or(DocumentFormat::Json) {
        DocumentFormat::Json => Ok(serde_json::from_reader(reader)?),
        DocumentFormat::Yaml => Ok(serde_yaml::from_reader(reader)?),
    }
}

/// Writes a document, treating unknown extensions as JSON.
///
/// # Errors
///
/// Returns [`IoError`](crate::CatalogError::IoError) if the file cannot be
/// created, or a JSON/YAML error if serialization fails.
pub fn write_document<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(std::fs::File::create(path)?);
    match DocumentFormat::from_path(path).unwrap_or(DocumentFormat::Json) {
        DocumentFormat::Json => serde_json::to_writer_pretty(writer, value)?,
        DocumentFormat::Yaml => serde_yaml::to_writer(writer, value)?,
    }
    Ok(())
}
