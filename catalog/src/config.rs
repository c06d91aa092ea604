//! Engine configuration files.
//!
//! One YAML (or JSON) file holds the validator and parser options plus the
//! places named schemas are loaded from.
//!
//! # Example YAML
//!
//! ```yaml
//! validator:
//!   allowEmptyArrays: true
//!   returnAllErrors: true
//!   dateStrings: true
//!   dateFormat: yyyy-mm-dd
//! parser:
//!   structure: flat
//!   dateFormat: yyyy-mm-dd
//! schemaDirs:
//!   - schemas
//! bundles:
//!   - shared/common.yaml
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shapecheck_engine::{ParserOptions, ValidatorOptions};

use crate::document::{read_document, write_document};
use crate::error::Result;
use crate::loader::SchemaCatalog;

/// Top-level engine configuration.
///
/// Every section is optional; missing keys take the option defaults.
///
/// # Examples
///
/// ```
/// use shapecheck_catalog::EngineConfig;
/// use shapecheck_engine::Structure;
///
/// let config: EngineConfig = serde_yaml::from_str(
///     "validator:\n  returnAllErrors: true\nparser:\n  structure: flat\n",
/// )
/// .unwrap();
/// assert!(config.validator.return_all_errors);
/// assert_eq!(config.parser.structure, Structure::Flat);
/// assert!(config.schema_dirs.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub validator: ValidatorOptions,
    pub parser: ParserOptions,
    /// Directories holding one named schema per file.
    pub schema_dirs: Vec<PathBuf>,
    /// Files mapping names to schemas.
    pub bundles: Vec<PathBuf>,
}

impl EngineConfig {
    /// Loads configuration from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::CatalogError::IoError) if the file cannot
    /// be read, or a JSON/YAML error if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_document(path)
    }

    /// Saves the configuration; the extension picks YAML or JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::CatalogError::IoError) if the file cannot
    /// be written, or a JSON/YAML error if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_document(path, self)
    }

    /// Loads and merges every configured directory and bundle.
    ///
    /// Relative paths are resolved against `base_dir`, usually the directory
    /// of the configuration file. Later sources win on name clashes; bundles
    /// are merged after directories.
    ///
    /// # Errors
    ///
    /// Propagates the first source that fails to load.
    pub fn catalog(&self, base_dir: impl AsRef<Path>) -> Result<SchemaCatalog> {
        let base_dir = base_dir.as_ref();
        let mut catalog = SchemaCatalog::new();
        for dir in &self.schema_dirs {
            catalog.merge(SchemaCatalog::from_dir(base_dir.join(dir))?);
        }
        for bundle in &self.bundles {
            catalog.merge(SchemaCatalog::from_bundle(base_dir.join(bundle))?);
        }
        Ok(catalog)
    }

    /// Validator options wired to `catalog`.
    pub fn validator_options(&self, catalog: &SchemaCatalog) -> ValidatorOptions {
        self.validator.clone().with_schemas(catalog.named().clone())
    }

    /// Parser options wired to `catalog`.
    pub fn parser_options(&self, catalog: &SchemaCatalog) -> ParserOptions {
        self.parser.clone().with_schemas(catalog.named().clone())
    }
}

#[cfg(test)]
mod tests {
    use shapecheck_core::DateFormat;
    use shapecheck_engine::Structure;

    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
validator:
  allowEmptyStrings: true
  allowEmptyArrays: true
  returnAllErrors: true
  convertDates: false
  dateStrings: true
  dateFormat: yyyy-mm-dd
parser:
  structure: flat
  dateFormat: iso
  parseDatesOnly: true
schemaDirs:
  - schemas
bundles:
  - common.json
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: EngineConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert!(config.validator.allow_empty_strings);
        assert!(config.validator.allow_empty_arrays);
        assert!(config.validator.return_all_errors);
        assert!(!config.validator.convert_dates);
        assert!(config.validator.date_strings);
        assert_eq!(config.validator.date_format, DateFormat::YearMonthDay);
        assert_eq!(config.parser.structure, Structure::Flat);
        assert_eq!(config.parser.date_format, DateFormat::Iso);
        assert!(config.parser.parse_dates_only);
        assert_eq!(config.schema_dirs, vec![PathBuf::from("schemas")]);
        assert_eq!(config.bundles, vec![PathBuf::from("common.json")]);
    }

    #[test]
    fn test_deserialize_empty() {
        let config: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert!(!config.validator.return_all_errors);
        assert_eq!(config.parser.structure, Structure::Structured);
        assert!(config.bundles.is_empty());
    }

    #[test]
    fn test_unknown_date_format_is_rejected() {
        let result: std::result::Result<EngineConfig, _> =
            serde_yaml::from_str("validator:\n  dateFormat: dd/mm/yyyy\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let original: EngineConfig = serde_yaml::from_str(sample_yaml()).unwrap();

        for file in ["config.yml", "config.json"] {
            let path = dir.path().join(file);
            original.save(&path).unwrap();
            let loaded = EngineConfig::load(&path).unwrap();
            assert_eq!(loaded.validator.date_format, original.validator.date_format);
            assert_eq!(loaded.parser.structure, original.parser.structure);
            assert_eq!(loaded.schema_dirs, original.schema_dirs);
            assert_eq!(loaded.bundles, original.bundles);
        }
    }

    #[test]
    fn test_catalog_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("schemas")).unwrap();
        std::fs::write(
            dir.path().join("schemas/Point.json"),
            r#"{"x": {"description": "x", "type": "number"}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("common.json"),
            r#"{"Tag": {"description": "tag", "type": "string"}}"#,
        )
        .unwrap();

        let config: EngineConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        let catalog = config.catalog(dir.path()).unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Point", "Tag"]);

        let options = config.validator_options(&catalog);
        assert!(options.schemas.contains_key("Point"));
        assert!(options.return_all_errors);
    }
}
