//! Validation engine.
//!
//! A [`Validator`] walks a compiled [`Plan`] against a candidate value and
//! reports the first problem, or every problem when `return_all_errors` is
//! set. Objects are closed: keys not declared in the schema are `unknown`.

use std::sync::Arc;

use indexmap::IndexMap;
use shapecheck_core::{
    DataPath, ErrorKind, Issue, Map, ParseError, PrimitiveType, SchemaDefinitionError, SchemaNode,
    TypeRef, Unresolved, ValidationError, Value, normalize, resolve_variant,
};
use tracing::debug;

use crate::options::{ParserOptions, ValidatorOptions};
use crate::parse::Parser;
use crate::plan::{CompiledVariation, ObjectMode, OneOfSet, Plan, PlanEntry, Shape};

/// Compiled validator for one schema.
///
/// Validators are immutable after construction and can be shared between
/// threads.
///
/// # Examples
///
/// ```
/// use shapecheck_engine::{Validator, ValidatorOptions};
/// use shapecheck_core::{ErrorKind, SchemaNode, Value};
/// use serde_json::json;
///
/// let schema = SchemaNode::from_json(json!({
///     "name": {"description": "Name", "type": "string"},
///     "age": {"description": "Age", "type": "positiveInteger", "required": false}
/// }))
/// .unwrap();
/// let validator = Validator::new(&schema, ValidatorOptions::default()).unwrap();
///
/// assert!(validator.validate(Value::from(json!({"name": "Ada"}))).is_ok());
///
/// let err = validator.validate(Value::from(json!({"name": "Ada", "age": 0}))).unwrap_err();
/// assert_eq!(err.kind, ErrorKind::Invalid);
/// assert_eq!(err.message, "age must be a positive integer");
/// ```
#[derive(Debug)]
pub struct Validator {
    plan: Arc<Plan>,
    options: ValidatorOptions,
    date_converter: Option<Parser>,
}

impl Validator {
    /// Normalizes and compiles `schema`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaDefinitionError`] when the schema is malformed.
    pub fn new(schema: &SchemaNode, options: ValidatorOptions) -> Result<Self, SchemaDefinitionError> {
        let normalized = normalize(schema, &options.schemas)?;
        let plan = Arc::new(Plan::compile(&normalized, &options.registry, false)?);
        let date_converter = options.convert_dates.then(|| {
            let parser_options = ParserOptions::default()
                .with_registry(Arc::clone(&options.registry))
                .with_date_format(options.date_format)
                .with_parse_dates_only(true);
            Parser::from_plan(Arc::clone(&plan), parser_options)
        });
        Ok(Self {
            plan,
            options,
            date_converter,
        })
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validates `value` and returns it.
    ///
    /// With `convert_dates`, date strings under `date` fields are converted
    /// to native dates in the returned value.
    ///
    /// # Errors
    ///
    /// Returns the (possibly remapped) [`ValidationError`].
    pub fn validate(&self, mut value: Value) -> Result<Value, ValidationError> {
        self.check(&value)?;
        if let Some(converter) = &self.date_converter {
            converter
                .parse_in_place(&mut value)
                .map_err(|err| self.remap(conversion_error(err)))?;
        }
        Ok(value)
    }

    /// Validates `value` without taking ownership or converting dates.
    ///
    /// # Errors
    ///
    /// Returns the (possibly remapped) [`ValidationError`].
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        let mut walk = Walk {
            options: &self.options,
            issues: Vec::new(),
        };
        let root_parent = Value::Object(Map::new());
        // An abort only means the first issue was recorded.
        let _ = walk.entry(&self.plan.root, Some(value), &root_parent, &DataPath::root());
        match ValidationError::from_issues(walk.issues) {
            None => Ok(()),
            Some(err) => Err(self.remap(err)),
        }
    }

    fn remap(&self, err: ValidationError) -> ValidationError {
        match &self.options.create_validation_error {
            Some(hook) => hook(err),
            None => err,
        }
    }
}

fn conversion_error(err: ParseError) -> ValidationError {
    let issue = Issue::new(err.kind, &err.path, err.message).with_value(err.value.as_ref());
    ValidationError {
        kind: issue.kind,
        path: issue.path.clone(),
        value: issue.value.clone(),
        message: issue.message.clone(),
        errors: vec![issue],
    }
}

/// Stops the walk after the first issue.
struct Abort;

type Flow = Result<(), Abort>;

struct Walk<'a> {
    options: &'a ValidatorOptions,
    issues: Vec<Issue>,
}

impl Walk<'_> {
    fn report(&mut self, issue: Issue) -> Flow {
        self.issues.push(issue);
        if self.options.return_all_errors {
            Ok(())
        } else {
            Err(Abort)
        }
    }

    fn fail(&mut self, kind: ErrorKind, path: &DataPath, value: Option<&Value>, message: String) -> Flow {
        self.report(Issue::new(kind, path, message).with_value(value))
    }

    fn entry(&mut self, entry: &PlanEntry, value: Option<&Value>, parent: &Value, path: &DataPath) -> Flow {
        let required = entry.is_required(parent);
        match value {
            None if required => self.fail(
                ErrorKind::Required,
                path,
                None,
                format!("{} is a required field", path.label()),
            ),
            None => Ok(()),
            Some(Value::Null) => {
                if required && entry.nullable != Some(true) {
                    self.fail(
                        ErrorKind::Required,
                        path,
                        value,
                        format!("{} is a required field", path.label()),
                    )
                } else if entry.nullable == Some(false) {
                    self.fail(
                        ErrorKind::TypeMismatch,
                        path,
                        value,
                        format!("{} cannot be null", path.label()),
                    )
                } else {
                    Ok(())
                }
            }
            Some(present) => self.shape(&entry.shape, required, present, path),
        }
    }

    fn shape(&mut self, shape: &Shape, required: bool, value: &Value, path: &DataPath) -> Flow {
        match shape {
            Shape::Any | Shape::Hooked(_) => Ok(()),
            Shape::Typed(ty) => self.leaf(ty, required, value, path),
            Shape::OneOf(set) => self.one_of(set, value, path),
            Shape::ArrayOf { element, non_empty } => self.array(element, *non_empty, value, path),
            Shape::ObjectOf {
                value: value_entry,
                key_one_of,
                key_type,
            } => self.object_of(value_entry, key_one_of.as_deref(), key_type.as_ref(), value, path),
            Shape::Object { fields, mode } => self.object(fields, *mode, value, path),
            Shape::Union(variations) => self.union(variations, required, value, path),
        }
    }

    fn leaf(&mut self, ty: &TypeRef, required: bool, value: &Value, path: &DataPath) -> Flow {
        let label = path.label();
        let ty = match ty {
            TypeRef::Primitive(ty) => *ty,
            TypeRef::Custom { ty, .. } => {
                return match ty.validate(value) {
                    Ok(()) => Ok(()),
                    Err(reason) => {
                        self.fail(ErrorKind::Invalid, path, Some(value), format!("{label} {reason}"))
                    }
                };
            }
        };

        if ty.is_string_like() {
            let Value::String(s) = value else {
                return self.fail(
                    ErrorKind::TypeMismatch,
                    path,
                    Some(value),
                    format!("{label} must be {}", ty.article_name()),
                );
            };
            if s.is_empty() {
                return if required {
                    self.fail(
                        ErrorKind::Required,
                        path,
                        Some(value),
                        format!("{label} is a required field"),
                    )
                } else if self.options.allow_empty_strings {
                    Ok(())
                } else {
                    self.fail(
                        ErrorKind::Invalid,
                        path,
                        Some(value),
                        format!("{label} cannot be an empty string"),
                    )
                };
            }
            if ty == PrimitiveType::DateString && !self.options.date_format.matches(s) {
                return self.fail(
                    ErrorKind::Invalid,
                    path,
                    Some(value),
                    format!(
                        "{label} must be a date string in the format {}",
                        self.options.date_format.template()
                    ),
                );
            }
            if !ty.accepts_str_format(s) {
                return self.fail(
                    ErrorKind::Invalid,
                    path,
                    Some(value),
                    format!("{label} must be {}", ty.article_name()),
                );
            }
            return Ok(());
        }

        if ty.is_numeric() {
            let Some(n) = value.as_f64() else {
                return self.fail(
                    ErrorKind::TypeMismatch,
                    path,
                    Some(value),
                    format!("{label} must be {}", ty.article_name()),
                );
            };
            if !ty.accepts_number(n) {
                return self.fail(
                    ErrorKind::Invalid,
                    path,
                    Some(value),
                    format!("{label} must be {}", ty.article_name()),
                );
            }
            return Ok(());
        }

        match (ty, value) {
            (PrimitiveType::Boolean, Value::Bool(_)) | (PrimitiveType::Date, Value::Date(_)) => Ok(()),
            (PrimitiveType::Date, Value::String(s)) if self.options.accepts_date_strings() => {
                if self.options.date_format.parse(s).is_some() {
                    Ok(())
                } else {
                    self.fail(
                        ErrorKind::Invalid,
                        path,
                        Some(value),
                        format!(
                            "{label} must be a date in the format {}",
                            self.options.date_format.template()
                        ),
                    )
                }
            }
            (PrimitiveType::Any, _) => Ok(()),
            _ => self.fail(
                ErrorKind::TypeMismatch,
                path,
                Some(value),
                format!("{label} must be {}", ty.article_name()),
            ),
        }
    }

    fn one_of(&mut self, set: &OneOfSet, value: &Value, path: &DataPath) -> Flow {
        if set.contains(value) {
            return Ok(());
        }
        self.fail(
            ErrorKind::Invalid,
            path,
            Some(value),
            format!(
                "{} must be one of the following values: {}",
                path.label(),
                set.listing()
            ),
        )
    }

    fn array(&mut self, element: &PlanEntry, non_empty: Option<bool>, value: &Value, path: &DataPath) -> Flow {
        let Value::Array(items) = value else {
            return self.fail(
                ErrorKind::Unsupported,
                path,
                Some(value),
                format!("{} must be an array", path.label()),
            );
        };
        let allow_empty = match non_empty {
            Some(non_empty) => !non_empty,
            None => self.options.allow_empty_arrays,
        };
        if items.is_empty() && !allow_empty {
            return self.fail(
                ErrorKind::Invalid,
                path,
                Some(value),
                format!("{} must have at least 1 item", path.label()),
            );
        }
        for (index, item) in items.iter().enumerate() {
            self.entry(element, Some(item), value, &path.index(index))?;
        }
        Ok(())
    }

    fn object_of(
        &mut self,
        value_entry: &PlanEntry,
        key_one_of: Option<&[String]>,
        key_type: Option<&TypeRef>,
        value: &Value,
        path: &DataPath,
    ) -> Flow {
        let Value::Object(map) = value else {
            return self.fail(
                ErrorKind::Unsupported,
                path,
                Some(value),
                format!("{} must be an object", path.label()),
            );
        };
        for (key, item) in map {
            let item_path = path.key(key);
            if key_one_of.is_some_and(|allowed| !allowed.iter().any(|k| k == key)) {
                self.fail(
                    ErrorKind::Unknown,
                    &item_path,
                    Some(item),
                    format!("{item_path} is not allowed"),
                )?;
                continue;
            }
            if let Some(key_type) = key_type {
                if !self.key_matches(key_type, key) {
                    self.fail(
                        ErrorKind::Invalid,
                        &item_path,
                        Some(item),
                        format!("{item_path} has a key that must be {}", key_type_name(key_type)),
                    )?;
                    continue;
                }
            }
            self.entry(value_entry, Some(item), value, &item_path)?;
        }
        Ok(())
    }

    /// Runs a key through its leaf type in a scratch walk.
    fn key_matches(&self, key_type: &TypeRef, key: &str) -> bool {
        let mut scratch = Walk {
            options: self.options,
            issues: Vec::new(),
        };
        let _ = scratch.leaf(key_type, true, &Value::String(key.to_string()), &DataPath::root());
        scratch.issues.is_empty()
    }

    fn object(
        &mut self,
        fields: &IndexMap<String, PlanEntry>,
        mode: ObjectMode,
        value: &Value,
        path: &DataPath,
    ) -> Flow {
        let Value::Object(map) = value else {
            return self.fail(
                ErrorKind::Unsupported,
                path,
                Some(value),
                format!("{} must be an object", path.label()),
            );
        };
        if mode == ObjectMode::AnyObject {
            return Ok(());
        }
        for (key, item) in map {
            if mode == ObjectMode::Empty || !fields.contains_key(key) {
                let item_path = path.key(key);
                self.fail(
                    ErrorKind::Unknown,
                    &item_path,
                    Some(item),
                    format!("{item_path} is not allowed"),
                )?;
            }
        }
        for (name, field) in fields {
            self.entry(field, map.get(name), value, &path.key(name))?;
        }
        Ok(())
    }

    fn union(&mut self, variations: &[CompiledVariation], required: bool, value: &Value, path: &DataPath) -> Flow {
        let allow_empty = self.options.allow_empty_arrays;
        let date_strings = self.options.accepts_date_strings();
        let date_format = self.options.date_format;
        let resolved = resolve_variant(
            variations,
            value,
            |variation| {
                if date_strings {
                    variation.tag.matches_with_date_strings(value, date_format)
                } else {
                    variation.tag.matches(value)
                }
            },
            |variation| variation.tolerates_empty(allow_empty),
        );
        match resolved {
            Ok(index) => {
                debug!(path = %path, variation = variations[index].description(), "Resolved type variation");
                self.shape(&variations[index].body.shape, required, value, path)
            }
            Err(Unresolved::Ambiguous(candidates)) => {
                let names = candidates
                    .iter()
                    .map(|&i| format!("\"{}\"", variations[i].description()))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.fail(
                    ErrorKind::Ambiguous,
                    path,
                    Some(value),
                    format!("{} matches more than one type variation: {names}", path.label()),
                )
            }
            Err(Unresolved::NoMatch) => self.fail(
                ErrorKind::Unsupported,
                path,
                Some(value),
                format!("{} does not match any supported type variation", path.label()),
            ),
        }
    }
}

fn key_type_name(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Primitive(ty) => ty.article_name().to_string(),
        TypeRef::Custom { name, .. } => format!("of type {name}"),
    }
}
