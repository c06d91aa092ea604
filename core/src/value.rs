//! Dynamic values checked by validators and produced by parsers.
//!
//! [`Value`] mirrors [`serde_json::Value`] with one addition: a native
//! [`Value::Date`] variant. Parsers turn date strings into dates, and the
//! `date` primitive type expects one when validating.
//!
//! Absent properties ("undefined") are not a variant. They are modelled by the
//! absence of a key, so lookups return `Option<&Value>`.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::dates;

/// Ordered property map used by [`Value::Object`].
pub type Map = IndexMap<String, Value>;

/// A dynamically-typed datum.
///
/// # Examples
///
/// ```
/// use shapecheck_core::Value;
///
/// let value = Value::from(serde_json::json!({"a": [1, "x", null]}));
/// assert!(value.is_object());
/// assert_eq!(value.get("a").and_then(Value::as_array).map(Vec::len), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// JSON `null`.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer or floating point number.
    Number(Number),
    /// UTF-8 string.
    String(String),
    /// Point in time, always normalized to UTC.
    Date(DateTime<Utc>),
    /// Sequence.
    Array(Vec<Value>),
    /// Insertion-ordered mapping.
    Object(Map),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a property when `self` is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Builds a number value, keeping integral values as integers.
    ///
    /// Returns `None` for NaN and infinities, which JSON cannot represent.
    pub fn from_f64(n: f64) -> Option<Value> {
        if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
            return Some(Value::Number(Number::from(n as i64)));
        }
        Number::from_f64(n).map(Value::Number)
    }

    /// Strict equality in the JavaScript `===` sense for scalars.
    ///
    /// Numbers compare by numeric value (`1` equals `1.0`). Containers compare
    /// structurally.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.strict_eq(other)))
            }
            _ => self == other,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Date(date) => serde_json::Value::String(dates::format_iso(&date)),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(map) => {
                serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Date(date) => f.write_str(&dates::format_iso(date)),
            other => {
                let json: serde_json::Value = other.clone().into();
                write!(f, "{json}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_json_preserves_key_order() {
        let value = Value::from(json!({"z": 1, "a": 2, "m": 3}));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_dates_render_as_iso_strings() {
        let date = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let json: serde_json::Value = Value::Array(vec![Value::Date(date)]).into();
        assert_eq!(json, json!(["2000-01-01T00:00:00.000Z"]));
    }

    #[test]
    fn test_strict_eq_compares_numbers_numerically() {
        let one = Value::from(json!(1));
        let one_float = Value::from(json!(1.0));
        assert!(one.strict_eq(&one_float));
        assert!(!one.strict_eq(&Value::from("1")));
    }

    #[test]
    fn test_from_f64_keeps_integers_integral() {
        assert_eq!(Value::from_f64(3.0), Some(Value::from(3_i64)));
        assert!(Value::from_f64(f64::NAN).is_none());
        assert_eq!(Value::from_f64(1.5).and_then(|v| v.as_f64()), Some(1.5));
    }
}
