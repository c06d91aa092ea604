//! Parsing engine.
//!
//! A [`Parser`] coerces string-encoded data into the native types its schema
//! describes. Two input layouts are supported:
//!
//! - **structured**: containers are already native, only leaf strings are
//!   coerced;
//! - **flat**: the root is a map of strings (query parameters, CSV columns);
//!   a string destined for an array or object is decoded as JSON once, and
//!   everything below it is treated as structured.
//!
//! Parsing does not check requirements; absent properties and nulls pass
//! through untouched. An empty string destined for a non-string leaf becomes
//! `null`.

mod leaf;
mod union;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use shapecheck_core::{
    DataPath, ErrorKind, NativeType, ParseError, PrimitiveType, SchemaDefinitionError, SchemaNode,
    TypeRef, Value, normalize,
};

use crate::options::{ParserOptions, Structure};
use crate::plan::{ObjectMode, OneOfSet, Plan, PlanEntry, Shape};

pub use leaf::{FALSE_LITERALS, TRUE_LITERALS};

/// Where the walk is relative to flat-mode decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// The flat root container; its children are flat strings.
    FlatRoot,
    /// A direct child of the flat root; containers arrive as JSON text.
    Flat,
    /// Containers are native.
    Structured,
}

/// Compiled parser for one schema.
///
/// `oneOfType` variations see raw strings, so a string matches every branch
/// whose body could parse it. A `string | number` union therefore reports
/// `"12"` as [`ErrorKind::Ambiguous`] in both layouts instead of guessing.
/// When identifiers arrive as text, give only one branch the ability to read
/// them (a `oneOf` list or a custom type, for example).
///
/// # Examples
///
/// ```
/// use shapecheck_engine::{Parser, ParserOptions};
/// use shapecheck_core::{SchemaNode, Value};
/// use serde_json::json;
///
/// let schema = SchemaNode::from_json(json!({
///     "page": {"description": "Page", "type": "positiveInteger"},
///     "archived": {"description": "Archived", "type": "boolean"},
///     "filter": {"kind": {"description": "Kind", "oneOf": ["a", "b"]}}
/// }))
/// .unwrap();
/// let parser = Parser::new(&schema, ParserOptions::default().flat()).unwrap();
///
/// let parsed = parser
///     .parse(Value::from(json!({"page": "2", "archived": "✓", "filter": "{\"kind\":\"a\"}"})))
///     .unwrap();
/// assert_eq!(
///     serde_json::Value::from(parsed),
///     json!({"page": 2, "archived": true, "filter": {"kind": "a"}})
/// );
/// ```
pub struct Parser {
    plan: Arc<Plan>,
    options: ParserOptions,
}

impl Parser {
    /// Normalizes and compiles `schema`.
    ///
    /// Unknown type names are accepted when a `parse_property` hook is set.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaDefinitionError`] when the schema is malformed.
    pub fn new(schema: &SchemaNode, options: ParserOptions) -> Result<Self, SchemaDefinitionError> {
        let normalized = normalize(schema, &options.schemas)?;
        let plan = Plan::compile(
            &normalized,
            &options.registry,
            options.parse_property.is_some(),
        )?;
        Ok(Self::from_plan(Arc::new(plan), options))
    }

    pub(crate) fn from_plan(plan: Arc<Plan>, options: ParserOptions) -> Self {
        Self { plan, options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parses `value` and returns the coerced result.
    ///
    /// # Errors
    ///
    /// Returns the (possibly remapped) [`ParseError`].
    pub fn parse(&self, mut value: Value) -> Result<Value, ParseError> {
        self.parse_in_place(&mut value)?;
        Ok(value)
    }

    /// Parses `value` in place.
    ///
    /// On error, values visited before the failure have already been
    /// coerced.
    ///
    /// # Errors
    ///
    /// Returns the (possibly remapped) [`ParseError`].
    pub fn parse_in_place(&self, value: &mut Value) -> Result<(), ParseError> {
        let mode = match self.options.structure {
            Structure::Flat => Mode::FlatRoot,
            Structure::Structured => Mode::Structured,
        };
        self.entry(&self.plan.root, value, mode, &DataPath::root())
            .map_err(|err| match &self.options.create_parse_error {
                Some(hook) => hook(err),
                None => err,
            })
    }

    fn entry(&self, entry: &PlanEntry, slot: &mut Value, mode: Mode, path: &DataPath) -> Result<(), ParseError> {
        if slot.is_null() {
            return Ok(());
        }
        self.shape(&entry.shape, slot, mode, path)
    }

    fn shape(&self, shape: &Shape, slot: &mut Value, mode: Mode, path: &DataPath) -> Result<(), ParseError> {
        match shape {
            Shape::Any => Ok(()),
            Shape::Typed(ty) => self.typed(ty, slot, path),
            Shape::Hooked(name) => self.hooked(name, slot, path),
            Shape::OneOf(set) => self.one_of(set, slot, path),
            Shape::ArrayOf { element, .. } => self.array(element, slot, mode, path),
            Shape::ObjectOf {
                value,
                key_one_of,
                key_type,
            } => self.object_of(value, key_one_of.as_deref(), key_type.as_ref(), slot, mode, path),
            Shape::Object { fields, mode: object_mode } => {
                self.object(fields, *object_mode, slot, mode, path)
            }
            Shape::Union(variations) => self.union(variations, slot, mode, path),
        }
    }

    fn typed(&self, ty: &TypeRef, slot: &mut Value, path: &DataPath) -> Result<(), ParseError> {
        if self.options.parse_dates_only && !ty.is_date() {
            return Ok(());
        }
        if let Value::String(raw) = slot {
            *slot = self.coerce(ty, raw, path)?;
        }
        Ok(())
    }

    /// Converts `raw` to the native form of `ty`.
    fn coerce(&self, ty: &TypeRef, raw: &str, path: &DataPath) -> Result<Value, ParseError> {
        if raw.is_empty() && !is_string_like(ty) {
            return Ok(Value::Null);
        }
        let invalid = |message: String| {
            ParseError::new(ErrorKind::Invalid, path, &Value::String(raw.to_string()), message)
        };
        let label = path.label();
        match ty {
            TypeRef::Custom { ty, .. } => ty.parse(raw).map_err(|reason| invalid(format!("{label} {reason}"))),
            TypeRef::Primitive(PrimitiveType::Boolean) => leaf::boolean(raw)
                .map(Value::Bool)
                .ok_or_else(|| invalid(format!("{label} must be a boolean"))),
            TypeRef::Primitive(PrimitiveType::Date) => self
                .options
                .date_format
                .parse(raw)
                .map(Value::Date)
                .ok_or_else(|| {
                    invalid(format!(
                        "{label} must be a date in the format {}",
                        self.options.date_format.template()
                    ))
                }),
            TypeRef::Primitive(ty) if ty.is_numeric() => leaf::number(*ty, raw)
                .ok_or_else(|| invalid(format!("{label} must be {}", ty.article_name()))),
            TypeRef::Primitive(_) => Ok(Value::String(raw.to_string())),
        }
    }

    fn hooked(&self, name: &str, slot: &mut Value, path: &DataPath) -> Result<(), ParseError> {
        if self.options.parse_dates_only {
            return Ok(());
        }
        if let Value::String(raw) = slot {
            *slot = self.run_hook(name, raw, path)?;
        }
        Ok(())
    }

    fn run_hook(&self, name: &str, raw: &str, path: &DataPath) -> Result<Value, ParseError> {
        let Some(hook) = &self.options.parse_property else {
            return Err(ParseError::new(
                ErrorKind::UnsupportedType,
                path,
                &Value::String(raw.to_string()),
                format!("{} has unsupported type {name}", path.label()),
            ));
        };
        let delegate = |type_name: &str| -> Result<Value, ParseError> {
            match self.options.registry.resolve(type_name) {
                Some(ty) => self.coerce(&ty, raw, path),
                None => Err(ParseError::new(
                    ErrorKind::UnsupportedType,
                    path,
                    &Value::String(raw.to_string()),
                    format!("{} has unsupported type {type_name}", path.label()),
                )),
            }
        };
        hook(name, raw, &delegate)
    }

    fn one_of(&self, set: &OneOfSet, slot: &mut Value, path: &DataPath) -> Result<(), ParseError> {
        if self.options.parse_dates_only {
            return Ok(());
        }
        if let Value::String(raw) = slot {
            if raw.is_empty() && set.kind != NativeType::String {
                *slot = Value::Null;
                return Ok(());
            }
            if let Some(coerced) = coerce_literal(set, raw) {
                *slot = coerced;
            }
        }
        if set.contains(slot) {
            return Ok(());
        }
        Err(ParseError::new(
            ErrorKind::Invalid,
            path,
            slot,
            format!(
                "{} must be one of the following values: {}",
                path.label(),
                set.listing()
            ),
        ))
    }

    /// Decodes JSON text for a container in flat mode and returns the mode
    /// for its children, or `None` when the slot became `null`.
    fn open_container(&self, slot: &mut Value, mode: Mode, path: &DataPath, noun: &str) -> Result<Option<Mode>, ParseError> {
        let decoded = match slot {
            Value::String(_) if mode == Mode::Structured => {
                return Err(ParseError::new(
                    ErrorKind::Unsupported,
                    path,
                    slot,
                    format!("{} must be {noun}", path.label()),
                ));
            }
            Value::String(raw) if raw.is_empty() => {
                *slot = Value::Null;
                return Ok(None);
            }
            Value::String(raw) => {
                let json: serde_json::Value = serde_json::from_str(raw).map_err(|err| {
                    ParseError::new(
                        ErrorKind::Invalid,
                        path,
                        &Value::String(raw.clone()),
                        format!("{} must be {noun} encoded as JSON: {err}", path.label()),
                    )
                })?;
                *slot = Value::from(json);
                true
            }
            _ => false,
        };
        Ok(Some(if mode == Mode::FlatRoot && !decoded {
            Mode::Flat
        } else {
            Mode::Structured
        }))
    }

    fn array(&self, element: &PlanEntry, slot: &mut Value, mode: Mode, path: &DataPath) -> Result<(), ParseError> {
        let Some(child_mode) = self.open_container(slot, mode, path, "an array")? else {
            return Ok(());
        };
        let Value::Array(items) = slot else {
            return Err(unsupported(slot, path, "an array"));
        };
        for (index, item) in items.iter_mut().enumerate() {
            self.entry(element, item, child_mode, &path.index(index))?;
        }
        Ok(())
    }

    fn object_of(
        &self,
        value_entry: &PlanEntry,
        key_one_of: Option<&[String]>,
        key_type: Option<&TypeRef>,
        slot: &mut Value,
        mode: Mode,
        path: &DataPath,
    ) -> Result<(), ParseError> {
        let Some(child_mode) = self.open_container(slot, mode, path, "an object")? else {
            return Ok(());
        };
        let Value::Object(map) = slot else {
            return Err(unsupported(slot, path, "an object"));
        };
        for (key, item) in map.iter_mut() {
            let item_path = path.key(key);
            if key_one_of.is_some_and(|allowed| !allowed.iter().any(|k| k == key)) {
                return Err(ParseError::new(
                    ErrorKind::Unknown,
                    &item_path,
                    item,
                    format!("{item_path} is not allowed"),
                ));
            }
            if let Some(key_type) = key_type {
                if self.coerce(key_type, key, &item_path).is_err() {
                    return Err(ParseError::new(
                        ErrorKind::Invalid,
                        &item_path,
                        item,
                        format!("{item_path} has a key that does not match type {}", key_type.name()),
                    ));
                }
            }
            self.entry(value_entry, item, child_mode, &item_path)?;
        }
        Ok(())
    }

    fn object(
        &self,
        fields: &IndexMap<String, PlanEntry>,
        object_mode: ObjectMode,
        slot: &mut Value,
        mode: Mode,
        path: &DataPath,
    ) -> Result<(), ParseError> {
        let Some(child_mode) = self.open_container(slot, mode, path, "an object")? else {
            return Ok(());
        };
        let Value::Object(map) = slot else {
            return Err(unsupported(slot, path, "an object"));
        };
        if object_mode == ObjectMode::AnyObject {
            return Ok(());
        }
        if let Some((key, item)) = map
            .iter()
            .find(|(key, _)| object_mode == ObjectMode::Empty || !fields.contains_key(*key))
        {
            let item_path = path.key(key);
            return Err(ParseError::new(
                ErrorKind::Unknown,
                &item_path,
                item,
                format!("{item_path} is not allowed"),
            ));
        }
        for (name, field) in fields {
            if let Some(child) = map.get_mut(name) {
                self.entry(field, child, child_mode, &path.key(name))?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("plan", &self.plan)
            .field("options", &self.options)
            .finish()
    }
}

fn is_string_like(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Primitive(ty) => ty.is_string_like() || *ty == PrimitiveType::Any,
        TypeRef::Custom { .. } => false,
    }
}

fn unsupported(value: &Value, path: &DataPath, noun: &str) -> ParseError {
    ParseError::new(
        ErrorKind::Unsupported,
        path,
        value,
        format!("{} must be {noun}", path.label()),
    )
}

/// Coerces a raw string to the literal kind of a `oneOf` set.
fn coerce_literal(set: &OneOfSet, raw: &str) -> Option<Value> {
    match set.kind {
        NativeType::Number => leaf::number(PrimitiveType::Number, raw),
        NativeType::Boolean => leaf::boolean(raw).map(Value::Bool),
        _ => None,
    }
}
