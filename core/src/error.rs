//! Error types.
//!
//! Two families exist and they never mix:
//!
//! - [`SchemaDefinitionError`] reports a malformed *schema*. It is raised
//!   while normalizing or compiling, so it surfaces at startup.
//! - [`ValidationError`] and [`ParseError`] report problems with *data* and
//!   are raised per call. Both carry an [`ErrorKind`], the [`DataPath`] of
//!   the offending value and the value itself.

use std::fmt;

use thiserror::Error;

use crate::path::DataPath;
use crate::value::Value;

/// Malformed schema definitions.
///
/// `path` fields address the schema tree (e.g. `a.oneOfType[1]`), not the
/// data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaDefinitionError {
    /// A `schema`/`extends` string names no registered schema.
    #[error("unknown schema reference \"{name}\" at {path}")]
    UnknownReference { name: String, path: String },
    /// A named schema (indirectly) references itself.
    #[error("schema reference cycle through \"{name}\" at {path}")]
    ReferenceCycle { name: String, path: String },
    /// `extends` has neither a `schema` nor a `oneOfType` sibling.
    #[error("extends requires a schema or oneOfType sibling at {path}")]
    ExtendsWithoutSchema { path: String },
    /// `extends` next to a `schema` that is itself a full entry.
    #[error("extends can only be combined with an inline property map at {path}")]
    ExtendsNonInlineSchema { path: String },
    /// The `extends` target does not describe an object.
    #[error("extends target must describe an object at {path}")]
    ExtendsNotObject { path: String },
    /// A `oneOfType` variation is missing a required field.
    #[error("type variation at {path} must declare `{field}`")]
    VariationMissingField { path: String, field: &'static str },
    /// A `oneOfType` variation carries its own `extends`.
    #[error("type variation at {path} cannot declare extends")]
    VariationExtends { path: String },
    /// Two or more variations with the same `is` lack a `when` clause.
    #[error("type variations with is \"{is}\" at {path} need a when clause to disambiguate")]
    AmbiguousVariations { is: String, path: String },
    /// A `when` clause on a variation whose `is` is not object-shaped.
    #[error("when clause is only allowed on object variations at {path}")]
    WhenOnNonObject { path: String },
    /// An `is` discriminator outside the supported tags.
    #[error("invalid is discriminator \"{tag}\" at {path}")]
    InvalidDiscriminator { tag: String, path: String },
    /// A type name the registry does not know.
    #[error("unknown type \"{name}\" at {path}")]
    UnknownType { name: String, path: String },
    /// A `oneOf` list that is empty, mixed, or holds non-scalar members.
    #[error("invalid oneOf list at {path}: {reason}")]
    InvalidOneOf { path: String, reason: String },
    /// A `$`-prefixed condition key that is not an operator.
    #[error("unknown condition operator \"{operator}\"")]
    UnknownOperator { operator: String },
    /// A condition operator with an operand of the wrong shape.
    #[error("condition operator \"{operator}\" {reason}")]
    InvalidOperand { operator: String, reason: String },
    /// An entry that declares no recognizable shape.
    #[error("schema entry at {path} declares no type, oneOf, arrayOf, objectOf, oneOfType or schema")]
    MissingShape { path: String },
    /// An entry that declares more than one shape key.
    #[error("schema entry at {path} declares more than one of type, oneOf, arrayOf, objectOf, oneOfType and schema")]
    ConflictingShapes { path: String },
    /// The schema document itself could not be read into the model.
    #[error("malformed schema: {0}")]
    Malformed(String),
}

/// Category of a data error.
///
/// # Examples
///
/// ```
/// use shapecheck_core::ErrorKind;
///
/// assert_eq!(ErrorKind::Required.as_str(), "required");
/// assert_eq!(ErrorKind::TypeMismatch.to_string(), "type-mismatch");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing mandatory property or value.
    Required,
    /// Property present in the data but absent from the schema.
    Unknown,
    /// Leaf value of the wrong native type.
    TypeMismatch,
    /// Value matches more than one `oneOfType` variation.
    Ambiguous,
    /// Value matches no variation, or is the wrong kind of container.
    Unsupported,
    /// Right native kind, failed refinement (format, range, membership).
    Invalid,
    /// Parsing reached a type name no parser or `parse_property` hook handles.
    UnsupportedType,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Required => "required",
            ErrorKind::Unknown => "unknown",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::Ambiguous => "ambiguous",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Invalid => "invalid",
            ErrorKind::UnsupportedType => "unsupported-type",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single data problem found during validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub kind: ErrorKind,
    pub path: DataPath,
    pub message: String,
    /// Offending value; `None` when the property was absent.
    pub value: Option<Value>,
}

impl Issue {
    pub fn new(kind: ErrorKind, path: &DataPath, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.clone(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: Option<&Value>) -> Self {
        self.value = value.cloned();
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validation failure returned by a compiled validator.
///
/// `kind`, `path` and `value` describe the first issue; `errors` lists every
/// issue found (exactly one unless all errors were requested).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub path: DataPath,
    pub value: Option<Value>,
    pub message: String,
    pub errors: Vec<Issue>,
}

impl ValidationError {
    /// Builds an error from collected issues.
    ///
    /// Returns `None` when `issues` is empty.
    pub fn from_issues(issues: Vec<Issue>) -> Option<Self> {
        let first = issues.first()?.clone();
        let message = if issues.len() == 1 {
            first.message.clone()
        } else {
            format!("{} errors occurred", issues.len())
        };
        Some(Self {
            kind: first.kind,
            path: first.path,
            value: first.value,
            message,
            errors: issues,
        })
    }

    /// Messages of every issue, in discovery order.
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|issue| issue.message.as_str()).collect()
    }
}

/// Parse failure returned by a compiled parser.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub path: DataPath,
    pub value: Option<Value>,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ErrorKind, path: &DataPath, value: &Value, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.clone(),
            value: Some(value.clone()),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_issue_keeps_its_message() {
        let path = DataPath::root().key("a");
        let err = ValidationError::from_issues(vec![Issue::new(
            ErrorKind::Required,
            &path,
            "a is a required field",
        )])
        .unwrap();
        assert_eq!(err.to_string(), "a is a required field");
        assert_eq!(err.kind, ErrorKind::Required);
        assert_eq!(err.path.to_string(), "a");
    }

    #[test]
    fn test_multiple_issues_are_counted() {
        let root = DataPath::root();
        let err = ValidationError::from_issues(vec![
            Issue::new(ErrorKind::Required, &root.key("a"), "a is a required field"),
            Issue::new(ErrorKind::Unknown, &root.key("b"), "b is not allowed"),
        ])
        .unwrap();
        assert_eq!(err.message, "2 errors occurred");
        assert_eq!(err.messages(), vec!["a is a required field", "b is not allowed"]);
    }

    #[test]
    fn test_no_issues_no_error() {
        assert!(ValidationError::from_issues(Vec::new()).is_none());
    }
}
