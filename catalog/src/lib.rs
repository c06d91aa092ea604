//! Named-schema catalogs and engine configuration files.
//!
//! This crate loads the named schemas that `schema`/`extends` references
//! resolve against, from directories (one schema per file) or bundles (one
//! file mapping names to schemas), and reads the configuration file that
//! sets validator and parser options.
//!
//! # Quick start
//!
//! ```no_run
//! use shapecheck_catalog::{EngineConfig, SchemaCatalog};
//! use shapecheck_engine::Validator;
//!
//! let config = EngineConfig::load("shapecheck.yml").unwrap();
//! let catalog = config.catalog(".").unwrap();
//! catalog.check().unwrap();
//!
//! let schema = catalog.get("User").unwrap();
//! let validator = Validator::new(schema, config.validator_options(&catalog)).unwrap();
//! ```

mod config;
mod document;
mod error;
mod loader;

pub use config::EngineConfig;
pub use document::{DocumentFormat, read_document, write_document};
pub use error::{CatalogError, Result};
pub use loader::{CatalogBuilder, CatalogSource, SchemaCatalog};
