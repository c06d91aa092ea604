//! Declarative `when` conditions.
//!
//! A condition tree maps property names to predicates. Every listed property
//! must satisfy its predicate (AND); properties not mentioned are ignored. A
//! top-level `$or` holds alternative trees, at least one of which must hold.
//!
//! Predicates are either raw literals (strict equality) or operator objects:
//!
//! | Operator | Holds when |
//! |---|---|
//! | `$exists` | presence (non-null) equals the operand |
//! | `$notEqual` | the value is absent or differs from the operand |
//! | `$oneOf` / `$notOneOf` | (non-)membership in the operand array |
//! | `$is` | the value matches an `is` discriminator tag |
//!
//! A plain (non-operator) object recurses into a sub-object; against an
//! array it must hold for every element. Dotted keys (`a.b`) traverse
//! sub-objects as well.
//!
//! Conditions are parsed once when a schema is read, so an unknown operator
//! is a [`SchemaDefinitionError`] rather than a runtime surprise.

use serde::{Deserialize, Serialize};

use crate::error::SchemaDefinitionError;
use crate::native::IsTag;
use crate::value::Value;

/// Operator applied to a single property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Exists(bool),
    NotEqual(Value),
    OneOf(Vec<Value>),
    NotOneOf(Vec<Value>),
    Is(IsTag),
}

/// What a single property must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Strict equality with a literal.
    Equals(Value),
    /// All operators must hold.
    Operators(Vec<Operator>),
    /// Sub-object (or every array element) must satisfy a nested tree.
    Nested(Condition),
}

/// Parsed condition tree.
///
/// # Examples
///
/// ```
/// use shapecheck_core::{Condition, Value};
/// use serde_json::json;
///
/// let when = Condition::from_json(&json!({
///     "kind": "card",
///     "number": {"$exists": true}
/// }))
/// .unwrap();
///
/// assert!(when.test(&Value::from(json!({"kind": "card", "number": "4242"}))));
/// assert!(!when.test(&Value::from(json!({"kind": "card"}))));
/// assert!(!when.test(&Value::from(json!({"kind": "iban", "number": "DE"}))));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct Condition {
    clauses: Vec<(String, Predicate)>,
    any_of: Option<Vec<Condition>>,
}

impl Condition {
    /// Parses a condition tree.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaDefinitionError::UnknownOperator`] for an unrecognized
    /// `$` key and [`SchemaDefinitionError::InvalidOperand`] when an operator
    /// receives the wrong kind of operand (e.g. `$oneOf` without an array).
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, SchemaDefinitionError> {
        let map = raw.as_object().ok_or_else(|| {
            SchemaDefinitionError::Malformed(format!("condition must be an object, got {raw}"))
        })?;

        let mut condition = Condition::default();
        for (key, value) in map {
            if key == "$or" {
                let alternatives = value.as_array().ok_or_else(|| invalid("$or", "requires an array"))?;
                let parsed = alternatives
                    .iter()
                    .map(Condition::from_json)
                    .collect::<Result<Vec<_>, _>>()?;
                condition.any_of = Some(parsed);
            } else if key.starts_with('$') {
                return Err(SchemaDefinitionError::UnknownOperator {
                    operator: key.clone(),
                });
            } else {
                condition.clauses.push((key.clone(), parse_predicate(value)?));
            }
        }
        Ok(condition)
    }

    /// Evaluates the tree against `candidate`.
    ///
    /// Non-object candidates have no properties, so every lookup is absent.
    pub fn test(&self, candidate: &Value) -> bool {
        let all = self
            .clauses
            .iter()
            .all(|(key, predicate)| predicate.test(lookup(candidate, key)));
        if !all {
            return false;
        }
        match &self.any_of {
            Some(alternatives) => alternatives.iter().any(|alt| alt.test(candidate)),
            None => true,
        }
    }

    /// Names of the top-level properties this tree reads.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(|(key, _)| key.as_str())
    }
}

impl Predicate {
    fn test(&self, value: Option<&Value>) -> bool {
        match self {
            Predicate::Equals(expected) => value.is_some_and(|v| v.strict_eq(expected)),
            Predicate::Operators(ops) => ops.iter().all(|op| op.test(value)),
            Predicate::Nested(inner) => match value {
                Some(Value::Array(items)) => items.iter().all(|item| inner.test(item)),
                Some(other) => inner.test(other),
                None => inner.test(&Value::Null),
            },
        }
    }
}

impl Operator {
    fn test(&self, value: Option<&Value>) -> bool {
        let present = value.filter(|v| !v.is_null());
        match self {
            Operator::Exists(expected) => present.is_some() == *expected,
            Operator::NotEqual(other) => !value.is_some_and(|v| v.strict_eq(other)),
            Operator::OneOf(options) => {
                value.is_some_and(|v| options.iter().any(|o| v.strict_eq(o)))
            }
            Operator::NotOneOf(options) => {
                !value.is_some_and(|v| options.iter().any(|o| v.strict_eq(o)))
            }
            Operator::Is(tag) => present.is_some_and(|v| tag.matches(v)),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Operator::Exists(_) => "$exists",
            Operator::NotEqual(_) => "$notEqual",
            Operator::OneOf(_) => "$oneOf",
            Operator::NotOneOf(_) => "$notOneOf",
            Operator::Is(_) => "$is",
        }
    }
}

fn lookup<'a>(candidate: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(direct) = candidate.get(key) {
        return Some(direct);
    }
    let mut current = candidate;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn invalid(operator: &str, reason: &str) -> SchemaDefinitionError {
    SchemaDefinitionError::InvalidOperand {
        operator: operator.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_predicate(raw: &serde_json::Value) -> Result<Predicate, SchemaDefinitionError> {
    let Some(map) = raw.as_object() else {
        return Ok(Predicate::Equals(Value::from(raw.clone())));
    };

    let operator_keys = map.keys().filter(|k| k.starts_with('$')).count();
    if operator_keys == 0 {
        return Ok(Predicate::Nested(Condition::from_json(raw)?));
    }
    if operator_keys != map.len() {
        return Err(SchemaDefinitionError::Malformed(format!(
            "condition mixes operators and property names: {raw}"
        )));
    }

    let mut ops = Vec::with_capacity(map.len());
    for (key, operand) in map {
        let op = match key.as_str() {
            "$exists" => Operator::Exists(
                operand
                    .as_bool()
                    .ok_or_else(|| invalid(key, "requires a boolean"))?,
            ),
            "$notEqual" => Operator::NotEqual(Value::from(operand.clone())),
            "$oneOf" | "$notOneOf" => {
                let options: Vec<Value> = operand
                    .as_array()
                    .ok_or_else(|| invalid(key, "requires an array"))?
                    .iter()
                    .cloned()
                    .map(Value::from)
                    .collect();
                if key == "$oneOf" {
                    Operator::OneOf(options)
                } else {
                    Operator::NotOneOf(options)
                }
            }
            "$is" => {
                let tag = operand
                    .as_str()
                    .ok_or_else(|| invalid(key, "requires a type tag string"))?;
                Operator::Is(
                    tag.parse()
                        .map_err(|_| invalid(key, &format!("has unknown type tag \"{tag}\"")))?,
                )
            }
            other => {
                return Err(SchemaDefinitionError::UnknownOperator {
                    operator: other.to_string(),
                });
            }
        };
        ops.push(op);
    }
    Ok(Predicate::Operators(ops))
}

impl TryFrom<serde_json::Value> for Condition {
    type Error = SchemaDefinitionError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Condition::from_json(&value)
    }
}

impl From<Condition> for serde_json::Value {
    fn from(condition: Condition) -> Self {
        let mut map = serde_json::Map::new();
        for (key, predicate) in condition.clauses {
            map.insert(key, predicate.into());
        }
        if let Some(alternatives) = condition.any_of {
            map.insert(
                "$or".to_string(),
                serde_json::Value::Array(alternatives.into_iter().map(Into::into).collect()),
            );
        }
        serde_json::Value::Object(map)
    }
}

impl From<Predicate> for serde_json::Value {
    fn from(predicate: Predicate) -> Self {
        match predicate {
            Predicate::Equals(value) => value.into(),
            Predicate::Nested(inner) => inner.into(),
            Predicate::Operators(ops) => {
                let mut map = serde_json::Map::new();
                for op in ops {
                    let name = op.name().to_string();
                    let operand = match op {
                        Operator::Exists(b) => serde_json::Value::Bool(b),
                        Operator::NotEqual(v) => v.into(),
                        Operator::OneOf(vs) | Operator::NotOneOf(vs) => {
                            serde_json::Value::Array(vs.into_iter().map(Into::into).collect())
                        }
                        Operator::Is(tag) => serde_json::Value::String(tag.to_string()),
                    };
                    map.insert(name, operand);
                }
                serde_json::Value::Object(map)
            }
        }
    }
}
