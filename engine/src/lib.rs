//! Schema compiler and evaluation engines.
//!
//! Schemas from [`shapecheck_core`] are normalized and compiled once into a
//! [`Plan`], which then backs two engines:
//!
//! - [`Validator`]: checks a value against the schema and reports
//!   `required`, `unknown`, `type-mismatch`, `ambiguous`, `unsupported` and
//!   `invalid` problems with their data paths.
//! - [`Parser`]: coerces string-encoded input (query strings, CSV columns,
//!   JSON text in flat uploads) into native values.
//!
//! Both engines are immutable after construction and may be shared across
//! threads.
//!
//! # Example
//!
//! ```
//! use shapecheck_core::{ErrorKind, SchemaNode, Value};
//! use shapecheck_engine::{Parser, ParserOptions, Validator, ValidatorOptions};
//! use serde_json::json;
//!
//! let schema = SchemaNode::from_json(json!({
//!     "id": {"description": "Id", "type": "positiveInteger"},
//!     "tags": {"description": "Tags", "arrayOf": "string", "required": false}
//! }))
//! .unwrap();
//!
//! let parser = Parser::new(&schema, ParserOptions::default().flat()).unwrap();
//! let validator = Validator::new(&schema, ValidatorOptions::default()).unwrap();
//!
//! let parsed = parser.parse(Value::from(json!({"id": "7", "tags": "[\"a\"]"}))).unwrap();
//! let valid = validator.validate(parsed).unwrap();
//! assert_eq!(serde_json::Value::from(valid), json!({"id": 7, "tags": ["a"]}));
//!
//! let err = validator.validate(Value::from(json!({"id": 7, "extra": true}))).unwrap_err();
//! assert_eq!(err.kind, ErrorKind::Unknown);
//! assert_eq!(err.path.to_string(), "extra");
//! ```

mod options;
mod parse;
pub mod plan;
mod validate;

pub use options::{
    ParseErrorHook, ParsePropertyHook, ParserOptions, Structure, ValidationErrorHook,
    ValidatorOptions,
};
pub use parse::{FALSE_LITERALS, Parser, TRUE_LITERALS};
pub use plan::Plan;
pub use validate::Validator;
