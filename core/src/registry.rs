//! Primitive type registry.
//!
//! Maps type names used in `type`, `arrayOf`, `objectOf` and `keyType` to
//! built-in [`PrimitiveType`]s or user-registered [`CustomType`]s.
//!
//! The registry is a plain value handed to the compilers. Hosts that want a
//! process-wide registry build one at startup and share it behind an
//! [`Arc`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::value::Value;

// SAFETY: These regexes are compile-time constants and are validated by tests.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("static regex must compile")
});
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^\s/?#]+[^\s]*$").expect("static regex must compile")
});
static RELATIVE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[^\s]*$").expect("static regex must compile"));

/// Built-in leaf types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Number,
    Integer,
    PositiveInteger,
    NonNegativeInteger,
    Boolean,
    /// Native date (or a date string, depending on engine options).
    Date,
    /// String in the configured date format, kept as a string.
    DateString,
    Email,
    Url,
    RelativeUrl,
    Any,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 12] = [
        PrimitiveType::String,
        PrimitiveType::Number,
        PrimitiveType::Integer,
        PrimitiveType::PositiveInteger,
        PrimitiveType::NonNegativeInteger,
        PrimitiveType::Boolean,
        PrimitiveType::Date,
        PrimitiveType::DateString,
        PrimitiveType::Email,
        PrimitiveType::Url,
        PrimitiveType::RelativeUrl,
        PrimitiveType::Any,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Number => "number",
            PrimitiveType::Integer => "integer",
            PrimitiveType::PositiveInteger => "positiveInteger",
            PrimitiveType::NonNegativeInteger => "nonNegativeInteger",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Date => "date",
            PrimitiveType::DateString => "dateString",
            PrimitiveType::Email => "email",
            PrimitiveType::Url => "url",
            PrimitiveType::RelativeUrl => "relativeUrl",
            PrimitiveType::Any => "any",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }

    pub fn is_date(self) -> bool {
        matches!(self, PrimitiveType::Date | PrimitiveType::DateString)
    }

    /// Types whose values are strings (subject to the empty-string rule).
    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            PrimitiveType::String
                | PrimitiveType::DateString
                | PrimitiveType::Email
                | PrimitiveType::Url
                | PrimitiveType::RelativeUrl
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimitiveType::Number
                | PrimitiveType::Integer
                | PrimitiveType::PositiveInteger
                | PrimitiveType::NonNegativeInteger
        )
    }

    /// Checks a numeric value against integer and sign constraints.
    pub fn accepts_number(self, n: f64) -> bool {
        if !n.is_finite() {
            return false;
        }
        match self {
            PrimitiveType::Number => true,
            PrimitiveType::Integer => n.fract() == 0.0,
            PrimitiveType::PositiveInteger => n.fract() == 0.0 && n > 0.0,
            PrimitiveType::NonNegativeInteger => n.fract() == 0.0 && n >= 0.0,
            _ => false,
        }
    }

    /// Format refinement of string-like types; plain strings always pass.
    pub fn accepts_str_format(self, s: &str) -> bool {
        match self {
            PrimitiveType::Email => EMAIL_RE.is_match(s),
            PrimitiveType::Url => URL_RE.is_match(s),
            PrimitiveType::RelativeUrl => RELATIVE_URL_RE.is_match(s),
            _ => true,
        }
    }

    /// Noun phrase used in messages ("must be a positive integer").
    pub fn article_name(self) -> &'static str {
        match self {
            PrimitiveType::String => "a string",
            PrimitiveType::Number => "a number",
            PrimitiveType::Integer => "an integer",
            PrimitiveType::PositiveInteger => "a positive integer",
            PrimitiveType::NonNegativeInteger => "a non-negative integer",
            PrimitiveType::Boolean => "a boolean",
            PrimitiveType::Date => "a date",
            PrimitiveType::DateString => "a date string",
            PrimitiveType::Email => "a valid email",
            PrimitiveType::Url => "a valid URL",
            PrimitiveType::RelativeUrl => "a valid relative URL",
            PrimitiveType::Any => "a value",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host-defined leaf type.
///
/// # Examples
///
/// ```
/// use shapecheck_core::{CustomType, TypeRegistry, Value};
///
/// struct Hex;
///
/// impl CustomType for Hex {
///     fn validate(&self, value: &Value) -> Result<(), String> {
///         match value.as_str() {
///             Some(s) if s.chars().all(|c| c.is_ascii_hexdigit()) => Ok(()),
///             _ => Err("must be a hex string".to_string()),
///         }
///     }
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.register("hex", Hex);
/// assert!(registry.resolve("hex").is_some());
/// assert!(registry.resolve("string").is_some());
/// assert!(registry.resolve("nope").is_none());
/// ```
pub trait CustomType: Send + Sync {
    /// Checks a non-null value; the error is the message suffix (e.g.
    /// `"must be a hex string"`).
    fn validate(&self, value: &Value) -> Result<(), String>;

    /// Converts a raw string to its typed form. Defaults to keeping the
    /// string.
    fn parse(&self, raw: &str) -> Result<Value, String> {
        Ok(Value::String(raw.to_string()))
    }

    /// Whether values of this type are dates (affects date-only parsing).
    fn is_date(&self) -> bool {
        false
    }
}

/// Resolved type reference.
#[derive(Clone)]
pub enum TypeRef {
    Primitive(PrimitiveType),
    Custom { name: String, ty: Arc<dyn CustomType> },
}

impl TypeRef {
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Primitive(ty) => ty.name(),
            TypeRef::Custom { name, .. } => name,
        }
    }

    pub fn is_date(&self) -> bool {
        match self {
            TypeRef::Primitive(ty) => ty.is_date(),
            TypeRef::Custom { ty, .. } => ty.is_date(),
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(ty) => write!(f, "Primitive({ty})"),
            TypeRef::Custom { name, .. } => write!(f, "Custom({name})"),
        }
    }
}

/// Name to type lookup table.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    custom: HashMap<String, Arc<dyn CustomType>>,
}

impl TypeRegistry {
    /// Registry containing only the built-in primitives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a custom type.
    ///
    /// Built-in names cannot be shadowed; registering one is ignored with a
    /// warning.
    pub fn register(&mut self, name: impl Into<String>, ty: impl CustomType + 'static) {
        let name = name.into();
        if PrimitiveType::from_name(&name).is_some() {
            tracing::warn!(type_name = %name, "Ignoring custom type that shadows a built-in type");
            return;
        }
        self.custom.insert(name, Arc::new(ty));
    }

    /// Looks up a type by name.
    pub fn resolve(&self, name: &str) -> Option<TypeRef> {
        if let Some(ty) = PrimitiveType::from_name(name) {
            return Some(TypeRef::Primitive(ty));
        }
        self.custom.get(name).map(|ty| TypeRef::Custom {
            name: name.to_string(),
            ty: Arc::clone(ty),
        })
    }

    /// Whether `name` resolves to a date-like type.
    pub fn is_date_type(&self, name: &str) -> bool {
        self.resolve(name).is_some_and(|ty| ty.is_date())
    }

    /// Names of registered custom types.
    pub fn custom_names(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.custom_names().collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("custom", &names).finish()
    }
}
