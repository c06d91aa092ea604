//! Named-schema catalogs with builder pattern and fallback chains.
//!
//! Schemas may reference each other by name (`"schema": "Address"`,
//! `"extends": "Entity"`); a [`SchemaCatalog`] is the name to schema table
//! those references resolve against.
//!
//! # Loading patterns
//!
//! ```no_run
//! use shapecheck_catalog::SchemaCatalog;
//!
//! // One schema per file, named by file stem (`address.yaml` -> "address")
//! let catalog = SchemaCatalog::from_dir("schemas/").unwrap();
//! assert!(catalog.get("address").is_some());
//!
//! // A single file mapping names to schemas
//! let catalog = SchemaCatalog::from_bundle("schemas.json").unwrap();
//!
//! // First source that loads wins
//! let catalog = SchemaCatalog::builder()
//!     .from_dir("/etc/app/schemas/")
//!     .from_bundle("schemas.json")
//!     .build()
//!     .unwrap();
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use shapecheck_core::{NamedSchemas, SchemaNode, normalize_named};
use tracing::{debug, info};

use crate::document::{DocumentFormat, read_document};
use crate::error::{CatalogError, Result};

/// Describes where a [`SchemaCatalog`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// Built in memory.
    Memory,
    /// A directory holding one schema per file.
    Directory(PathBuf),
    /// A single file mapping names to schemas.
    Bundle(PathBuf),
    /// A fallback chain, or several catalogs merged together.
    Multiple(Vec<CatalogSource>),
}

/// Name to schema lookup table.
///
/// # Examples
///
/// ```
/// use shapecheck_catalog::SchemaCatalog;
/// use shapecheck_core::SchemaNode;
/// use serde_json::json;
///
/// let mut catalog = SchemaCatalog::new();
/// catalog.insert(
///     "Address",
///     SchemaNode::from_json(json!({"city": {"description": "City", "type": "string"}})).unwrap(),
/// );
/// catalog.insert(
///     "User",
///     SchemaNode::from_json(json!({"home": {"description": "Home", "schema": "Address"}})).unwrap(),
/// );
///
/// let user = catalog.normalized("User").unwrap();
/// assert!(user.as_inline().is_some());
/// assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Address", "User"]);
/// ```
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    schemas: NamedSchemas,
    source: CatalogSource,
}

impl SchemaCatalog {
    /// Creates an empty in-memory catalog.
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
            source: CatalogSource::Memory,
        }
    }

    /// Returns a new [`CatalogBuilder`] for configuring a fallback chain.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Loads every `*.json`, `*.yaml` and `*.yml` file in `path` (not
    /// recursively). Each file is one schema named by its file stem.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::IoError`] if the directory or a file cannot be
    /// read, a JSON/YAML error if a file does not parse,
    /// [`CatalogError::InvalidSchema`] if a document is not a schema, or
    /// [`CatalogError::DuplicateName`] if two files share a stem.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut schemas = HashMap::new();

        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if !file_path.is_file() || DocumentFormat::from_path(&file_path).is_none() {
                continue;
            }
            let Some(name) = file_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw: serde_json::Value = read_document(&file_path)?;
            let node = parse_schema(name, raw)?;
            if schemas.insert(name.to_string(), node).is_some() {
                return Err(CatalogError::DuplicateName(name.to_string()));
            }
        }

        info!(dir = %path.display(), schemas = schemas.len(), "Loaded schema catalog");
        Ok(Self {
            schemas,
            source: CatalogSource::Directory(path.to_path_buf()),
        })
    }

    /// Loads a single JSON or YAML file whose top level maps names to
    /// schemas.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::IoError`] if the file cannot be read, a
    /// JSON/YAML error if parsing fails, [`CatalogError::InvalidBundle`] if
    /// the top level is not a mapping, or [`CatalogError::InvalidSchema`] for
    /// an entry that is not a schema.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw: serde_json::Value = read_document(path)?;
        let serde_json::Value::Object(entries) = raw else {
            return Err(CatalogError::InvalidBundle {
                path: path.to_path_buf(),
                reason: "top level must map schema names to schemas".to_string(),
            });
        };

        let mut schemas = HashMap::with_capacity(entries.len());
        for (name, raw) in entries {
            let node = parse_schema(&name, raw)?;
            schemas.insert(name, node);
        }

        info!(bundle = %path.display(), schemas = schemas.len(), "Loaded schema catalog");
        Ok(Self {
            schemas,
            source: CatalogSource::Bundle(path.to_path_buf()),
        })
    }

    /// Looks up a schema by name.
    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }

    /// Inserts a schema, replacing any existing entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, schema: SchemaNode) {
        self.schemas.insert(name.into(), schema);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Schema names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names.into_iter()
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    /// Adds every schema of `other`; entries of `other` win on name clashes.
    pub fn merge(&mut self, other: SchemaCatalog) {
        let mut sources = match std::mem::replace(&mut self.source, CatalogSource::Memory) {
            CatalogSource::Memory => Vec::new(),
            CatalogSource::Multiple(sources) => sources,
            single => vec![single],
        };
        if other.source != CatalogSource::Memory {
            sources.push(other.source);
        }
        self.source = match sources.len() {
            0 => CatalogSource::Memory,
            1 => sources.remove(0),
            _ => CatalogSource::Multiple(sources),
        };
        self.schemas.extend(other.schemas);
    }

    /// Returns the named schema with every reference expanded, `extends`
    /// merged and wrapper entries flattened.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidSchema`] if the name is unknown or the
    /// schema does not normalize against this catalog.
    pub fn normalized(&self, name: &str) -> Result<SchemaNode> {
        normalize_named(name, &self.schemas).map_err(|source| CatalogError::InvalidSchema {
            name: name.to_string(),
            source,
        })
    }

    /// Normalizes every schema, reporting the first broken one.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidSchema`] for the first schema (in name
    /// order) with an unknown reference, a reference cycle or misused
    /// `extends`.
    pub fn check(&self) -> Result<()> {
        for name in self.names() {
            self.normalized(name)?;
            debug!(schema = name, "Schema normalizes");
        }
        Ok(())
    }

    /// Borrows the name to schema table, as engine options expect it.
    pub fn named(&self) -> &NamedSchemas {
        &self.schemas
    }

    /// Consumes the catalog into its name to schema table.
    pub fn into_named(self) -> NamedSchemas {
        self.schemas
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_schema(name: &str, raw: serde_json::Value) -> Result<SchemaNode> {
    SchemaNode::from_json(raw).map_err(|source| CatalogError::InvalidSchema {
        name: name.to_string(),
        source,
    })
}

/// Builder for constructing a [`SchemaCatalog`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`CatalogError::NoSourcesAvailable`] is returned.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    sources: Vec<CatalogSource>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory of schema files as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(CatalogSource::Directory(path.into()));
        self
    }

    /// Adds a bundle file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(CatalogSource::Bundle(path.into()));
        self
    }

    /// Attempts to load schemas from configured sources in order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NoSourcesAvailable`] if no source loads.
    pub fn build(self) -> Result<SchemaCatalog> {
        let all_sources = self.sources.clone();

        for source in &self.sources {
            let result = match source {
                CatalogSource::Directory(path) => SchemaCatalog::from_dir(path),
                CatalogSource::Bundle(path) => SchemaCatalog::from_bundle(path),
                CatalogSource::Memory | CatalogSource::Multiple(_) => continue,
            };

            match result {
                Ok(mut catalog) => {
                    catalog.source = CatalogSource::Multiple(all_sources);
                    return Ok(catalog);
                }
                Err(err) => debug!(source = ?source, error = %err, "Catalog source failed"),
            }
        }

        Err(CatalogError::NoSourcesAvailable)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn write(dir: &Path, file: &str, contents: &str) {
        std::fs::write(dir.join(file), contents).unwrap();
    }

    fn address_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "Address.json",
            r#"{"city": {"description": "City", "type": "string"}}"#,
        );
        write(
            dir.path(),
            "User.yaml",
            "home:\n  description: Home\n  schema: Address\n",
        );
        write(dir.path(), "notes.txt", "not a schema");
        dir
    }

    #[test]
    fn test_from_dir() {
        let dir = address_dir();
        let catalog = SchemaCatalog::from_dir(dir.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("Address"));
        assert!(catalog.contains("User"));
        assert!(!catalog.contains("notes"));
        assert_eq!(catalog.source(), &CatalogSource::Directory(dir.path().to_path_buf()));
    }

    #[test]
    fn test_from_dir_rejects_duplicate_stems() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", r#"{"x": {"description": "x", "type": "string"}}"#);
        write(dir.path(), "a.yml", "x:\n  description: x\n  type: number\n");
        let err = SchemaCatalog::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName(name) if name == "a"));
    }

    #[test]
    fn test_from_dir_reports_schema_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.json", r#"{"description": "x", "type": 5}"#);
        let err = SchemaCatalog::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSchema { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_from_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        std::fs::write(
            &path,
            serde_json::to_string(&json!({
                "Address": {"city": {"description": "City", "type": "string"}},
                "Point": {"x": {"description": "x", "type": "number"}}
            }))
            .unwrap(),
        )
        .unwrap();

        let catalog = SchemaCatalog::from_bundle(&path).unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Address", "Point"]);
    }

    #[test]
    fn test_from_bundle_requires_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.yaml");
        std::fs::write(&path, "- a\n- b\n").unwrap();
        assert!(matches!(
            SchemaCatalog::from_bundle(&path),
            Err(CatalogError::InvalidBundle { .. })
        ));
    }

    #[test]
    fn test_builder_fallback() {
        let dir = address_dir();
        let catalog = SchemaCatalog::builder()
            .from_dir("/nonexistent/schemas/")
            .from_dir(dir.path())
            .build()
            .unwrap();
        assert!(catalog.contains("User"));
        assert!(matches!(catalog.source(), CatalogSource::Multiple(sources) if sources.len() == 2));
    }

    #[test]
    fn test_builder_all_fail() {
        let result = SchemaCatalog::builder()
            .from_dir("/nonexistent/dir/")
            .from_bundle("/nonexistent/bundle.json")
            .build();
        assert!(matches!(result, Err(CatalogError::NoSourcesAvailable)));
        assert!(matches!(
            SchemaCatalog::builder().build(),
            Err(CatalogError::NoSourcesAvailable)
        ));
    }

    #[test]
    fn test_merge_later_wins() {
        let mut first = SchemaCatalog::new();
        first.insert("A", SchemaNode::from_json(json!({"description": "a", "type": "string"})).unwrap());
        let mut second = SchemaCatalog::new();
        second.insert("A", SchemaNode::from_json(json!({"description": "a", "type": "number"})).unwrap());
        second.insert("B", SchemaNode::from_json(json!({"description": "b", "type": "boolean"})).unwrap());

        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.get("A").and_then(SchemaNode::as_entry).and_then(|e| e.type_str()), Some("number"));
        assert_eq!(first.source(), &CatalogSource::Memory);
    }

    #[test]
    fn test_check_finds_broken_references() {
        let dir = address_dir();
        let mut catalog = SchemaCatalog::from_dir(dir.path()).unwrap();
        assert!(catalog.check().is_ok());

        catalog.insert(
            "Order",
            SchemaNode::from_json(json!({"to": {"description": "To", "schema": "Adress"}})).unwrap(),
        );
        let err = catalog.check().unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSchema { ref name, .. } if name == "Order"));
    }
}
