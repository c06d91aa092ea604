//! Option sets for validators and parsers.
//!
//! The serializable parts of both option sets use the same camelCase keys as
//! configuration files, so a configuration section deserializes straight
//! into [`ValidatorOptions`] or [`ParserOptions`]. Named schemas, the type
//! registry and the hooks are runtime-only and skipped by serde.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shapecheck_core::{DateFormat, NamedSchemas, ParseError, TypeRegistry, ValidationError, Value};

/// Remaps every error a validator reports.
pub type ValidationErrorHook = Arc<dyn Fn(ValidationError) -> ValidationError + Send + Sync>;

/// Remaps every error a parser reports.
pub type ParseErrorHook = Arc<dyn Fn(ParseError) -> ParseError + Send + Sync>;

/// Parses a property whose type name the registry does not know.
///
/// Arguments are the type name, the raw string, and a callback that parses
/// the same raw string as another (known) type name.
pub type ParsePropertyHook = Arc<
    dyn Fn(&str, &str, &dyn Fn(&str) -> Result<Value, ParseError>) -> Result<Value, ParseError>
        + Send
        + Sync,
>;

/// How parser input is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Structure {
    /// Nested containers are already native; only leaf strings are coerced.
    #[default]
    Structured,
    /// A single-level map of strings; containers arrive as JSON text.
    Flat,
}

/// Validator configuration.
///
/// # Examples
///
/// ```
/// use shapecheck_engine::ValidatorOptions;
///
/// let options = ValidatorOptions::default()
///     .with_allow_empty_arrays(true)
///     .with_return_all_errors(true);
/// assert!(options.allow_empty_arrays);
/// assert!(!options.allow_empty_strings);
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorOptions {
    /// Lookup table for `schema`/`extends` references.
    #[serde(skip)]
    pub schemas: NamedSchemas,
    /// Accept `""` for optional string-like fields.
    pub allow_empty_strings: bool,
    /// Accept empty arrays unless the entry says `nonEmpty: true`.
    pub allow_empty_arrays: bool,
    /// Collect every issue instead of stopping at the first.
    pub return_all_errors: bool,
    /// Accept date strings for `date` and convert them after validation.
    pub convert_dates: bool,
    /// Accept date strings for `date` without converting them.
    pub date_strings: bool,
    pub date_format: DateFormat,
    #[serde(skip)]
    pub registry: Arc<TypeRegistry>,
    #[serde(skip)]
    pub create_validation_error: Option<ValidationErrorHook>,
}

impl ValidatorOptions {
    pub fn with_schemas(mut self, schemas: NamedSchemas) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_allow_empty_strings(mut self, allow: bool) -> Self {
        self.allow_empty_strings = allow;
        self
    }

    pub fn with_allow_empty_arrays(mut self, allow: bool) -> Self {
        self.allow_empty_arrays = allow;
        self
    }

    pub fn with_return_all_errors(mut self, all: bool) -> Self {
        self.return_all_errors = all;
        self
    }

    pub fn with_convert_dates(mut self, convert: bool) -> Self {
        self.convert_dates = convert;
        self
    }

    pub fn with_date_strings(mut self, date_strings: bool) -> Self {
        self.date_strings = date_strings;
        self
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    pub fn with_error_hook(
        mut self,
        hook: impl Fn(ValidationError) -> ValidationError + Send + Sync + 'static,
    ) -> Self {
        self.create_validation_error = Some(Arc::new(hook));
        self
    }

    /// Whether `date` fields accept strings in the configured format.
    pub(crate) fn accepts_date_strings(&self) -> bool {
        self.date_strings || self.convert_dates
    }
}

impl fmt::Debug for ValidatorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemas: Vec<_> = self.schemas.keys().collect();
        schemas.sort_unstable();
        f.debug_struct("ValidatorOptions")
            .field("schemas", &schemas)
            .field("allow_empty_strings", &self.allow_empty_strings)
            .field("allow_empty_arrays", &self.allow_empty_arrays)
            .field("return_all_errors", &self.return_all_errors)
            .field("convert_dates", &self.convert_dates)
            .field("date_strings", &self.date_strings)
            .field("date_format", &self.date_format)
            .field("registry", &self.registry)
            .field("create_validation_error", &self.create_validation_error.is_some())
            .finish()
    }
}

/// Parser configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParserOptions {
    #[serde(skip)]
    pub schemas: NamedSchemas,
    pub structure: Structure,
    pub date_format: DateFormat,
    /// Leave every non-date leaf untouched.
    pub parse_dates_only: bool,
    #[serde(skip)]
    pub registry: Arc<TypeRegistry>,
    #[serde(skip)]
    pub create_parse_error: Option<ParseErrorHook>,
    #[serde(skip)]
    pub parse_property: Option<ParsePropertyHook>,
}

impl ParserOptions {
    pub fn with_schemas(mut self, schemas: NamedSchemas) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_structure(mut self, structure: Structure) -> Self {
        self.structure = structure;
        self
    }

    pub fn flat(self) -> Self {
        self.with_structure(Structure::Flat)
    }

    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    pub fn with_parse_dates_only(mut self, dates_only: bool) -> Self {
        self.parse_dates_only = dates_only;
        self
    }

    pub fn with_error_hook(
        mut self,
        hook: impl Fn(ParseError) -> ParseError + Send + Sync + 'static,
    ) -> Self {
        self.create_parse_error = Some(Arc::new(hook));
        self
    }

    pub fn with_parse_property(
        mut self,
        hook: impl Fn(&str, &str, &dyn Fn(&str) -> Result<Value, ParseError>) -> Result<Value, ParseError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.parse_property = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for ParserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemas: Vec<_> = self.schemas.keys().collect();
        schemas.sort_unstable();
        f.debug_struct("ParserOptions")
            .field("schemas", &schemas)
            .field("structure", &self.structure)
            .field("date_format", &self.date_format)
            .field("parse_dates_only", &self.parse_dates_only)
            .field("registry", &self.registry)
            .field("create_parse_error", &self.create_parse_error.is_some())
            .field("parse_property", &self.parse_property.is_some())
            .finish()
    }
}
