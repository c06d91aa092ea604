//! Core model for declarative schema descriptions.
//!
//! This crate holds everything the validation and parsing engines share:
//!
//! - [`SchemaNode`] / [`SchemaEntry`]: the authored schema tree, read from
//!   JSON or YAML with keyword-based entry detection.
//! - [`normalize`]: reference expansion, `extends` merging and wrapper
//!   flattening into canonical form.
//! - [`Condition`]: the `when` mini-language used by dynamic `required` and
//!   by `oneOfType` guards.
//! - [`TypeRegistry`]: built-in [`PrimitiveType`]s plus host-registered
//!   [`CustomType`]s.
//! - [`resolve_variant`]: pure `oneOfType` resolution.
//! - [`Value`], [`DataPath`] and the error types.
//!
//! # Example
//!
//! ```
//! use shapecheck_core::*;
//! use serde_json::json;
//!
//! let schema = SchemaNode::from_json(json!({
//!     "name": {"description": "Name", "type": "string"},
//!     "tags": {"description": "Tags", "arrayOf": "string", "required": false}
//! }))
//! .unwrap();
//!
//! let normalized = normalize(&schema, &NamedSchemas::new()).unwrap();
//! assert_eq!(*normalized, schema);
//!
//! let guard = Condition::from_json(&json!({"tags": {"$exists": true}})).unwrap();
//! assert!(guard.test(&Value::from(json!({"name": "x", "tags": []}))));
//! ```

mod condition;
mod dates;
mod error;
mod native;
mod normalize;
mod path;
mod registry;
mod types;
mod value;
mod variant;

pub use condition::{Condition, Operator, Predicate};
pub use dates::{DateFormat, format_iso};
pub use error::{ErrorKind, Issue, ParseError, SchemaDefinitionError, ValidationError};
pub use native::{IsTag, NativeType, TagKind, is_uniform_array};
pub use normalize::{NamedSchemas, normalize, normalize_named};
pub use path::{DataPath, Segment};
pub use registry::{CustomType, PrimitiveType, TypeRef, TypeRegistry};
pub use types::{
    ENTRY_KEYWORDS, ElementSchema, PropertyMap, Required, SchemaEntry, SchemaNode, SchemaRef,
    TypeVariation,
};
pub use value::{Map, Value};
pub use variant::{Unresolved, Variant, guard_passes, resolve_by_native, resolve_variant};
