//! Native-type classification and `is` discriminators.

use std::fmt;
use std::str::FromStr;

use crate::dates::DateFormat;
use crate::value::Value;

/// Runtime shape of a non-null value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Date,
}

impl NativeType {
    /// Classifies `value`; `null` has no native type.
    ///
    /// # Examples
    ///
    /// ```
    /// use shapecheck_core::{NativeType, Value};
    ///
    /// assert_eq!(NativeType::of(&Value::from("x")), Some(NativeType::String));
    /// assert_eq!(NativeType::of(&Value::Array(vec![])), Some(NativeType::Array));
    /// assert_eq!(NativeType::of(&Value::Null), None);
    /// ```
    pub fn of(value: &Value) -> Option<NativeType> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(NativeType::Boolean),
            Value::Number(_) => Some(NativeType::Number),
            Value::String(_) => Some(NativeType::String),
            Value::Date(_) => Some(NativeType::Date),
            Value::Array(_) => Some(NativeType::Array),
            Value::Object(_) => Some(NativeType::Object),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NativeType::String => "string",
            NativeType::Number => "number",
            NativeType::Boolean => "boolean",
            NativeType::Object => "object",
            NativeType::Array => "array",
            NativeType::Date => "date",
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element kind named by an `is` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    String,
    Number,
    Boolean,
    Date,
    Object,
    /// Only valid in the array form (`any[]`).
    Any,
}

impl TagKind {
    fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (TagKind::Any, _) => true,
            (TagKind::String, Value::String(_))
            | (TagKind::Number, Value::Number(_))
            | (TagKind::Boolean, Value::Bool(_))
            | (TagKind::Date, Value::Date(_))
            | (TagKind::Object, Value::Object(_)) => true,
            _ => false,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            TagKind::String => "string",
            TagKind::Number => "number",
            TagKind::Boolean => "boolean",
            TagKind::Date => "date",
            TagKind::Object => "object",
            TagKind::Any => "any",
        }
    }
}

/// Parsed `is` discriminator of a `oneOfType` variation.
///
/// # Examples
///
/// ```
/// use shapecheck_core::{IsTag, TagKind, Value};
///
/// let tag: IsTag = "number[]".parse().unwrap();
/// assert_eq!(tag.kind, TagKind::Number);
/// assert!(tag.array);
/// assert!(tag.matches(&Value::from(serde_json::json!([1, 2]))));
/// assert!(!tag.matches(&Value::from(serde_json::json!([1, "2"]))));
/// assert!("any".parse::<IsTag>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsTag {
    pub kind: TagKind,
    pub array: bool,
}

impl IsTag {
    pub fn is_object(self) -> bool {
        self.kind == TagKind::Object
    }

    /// `any[]`, which matches every array.
    pub fn is_wildcard_array(self) -> bool {
        self.array && self.kind == TagKind::Any
    }

    /// A `T[]` tag with a concrete element kind.
    pub fn is_concrete_array(self) -> bool {
        self.array && self.kind != TagKind::Any
    }

    /// Tag of a single element of an array tag.
    pub fn element(self) -> IsTag {
        IsTag {
            kind: self.kind,
            array: false,
        }
    }

    /// Native-shape match of `value` against this tag.
    ///
    /// Array tags match when every element matches the element kind, so an
    /// empty array matches every array tag.
    pub fn matches(self, value: &Value) -> bool {
        match (self.array, value) {
            (true, Value::Array(items)) => items.iter().all(|item| self.kind.matches(item)),
            (true, _) => false,
            (false, _) => self.kind.matches(value),
        }
    }

    /// Like [`IsTag::matches`], but strings in `format` also count as dates.
    pub fn matches_with_date_strings(self, value: &Value, format: DateFormat) -> bool {
        if self.kind != TagKind::Date {
            return self.matches(value);
        }
        let is_date =
            |item: &Value| matches!(item, Value::Date(_)) || item.as_str().is_some_and(|s| format.matches(s));
        match (self.array, value) {
            (true, Value::Array(items)) => items.iter().all(is_date),
            (true, _) => false,
            (false, _) => is_date(value),
        }
    }
}

impl FromStr for IsTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, array) = match s.strip_suffix("[]") {
            Some(base) => (base, true),
            None => (s, false),
        };
        let kind = match base {
            "string" => TagKind::String,
            "number" => TagKind::Number,
            "boolean" => TagKind::Boolean,
            "date" => TagKind::Date,
            "object" => TagKind::Object,
            "any" if array => TagKind::Any,
            _ => return Err(s.to_string()),
        };
        Ok(IsTag { kind, array })
    }
}

impl fmt::Display for IsTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if self.array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// Returns `true` when every element of `items` has the same native type.
///
/// Nulls count as their own kind, so `[1, null]` is not uniform. Empty arrays
/// are uniform.
pub fn is_uniform_array(items: &[Value]) -> bool {
    let mut kinds = items.iter().map(NativeType::of);
    match kinds.next() {
        None => true,
        Some(first) => kinds.all(|kind| kind == first),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_tags_round_trip_through_display() {
        for raw in ["string", "number[]", "object", "object[]", "any[]", "date"] {
            let tag: IsTag = raw.parse().unwrap();
            assert_eq!(tag.to_string(), raw);
        }
    }

    #[test]
    fn test_rejects_unknown_tags() {
        assert!("array".parse::<IsTag>().is_err());
        assert!("string[][]".parse::<IsTag>().is_err());
    }

    #[test]
    fn test_scalar_tags_do_not_match_arrays() {
        let tag: IsTag = "string".parse().unwrap();
        assert!(!tag.matches(&v(json!(["a"]))));
        assert!(tag.matches(&v(json!("a"))));
    }

    #[test]
    fn test_empty_array_matches_every_array_tag() {
        for raw in ["string[]", "object[]", "any[]"] {
            let tag: IsTag = raw.parse().unwrap();
            assert!(tag.matches(&v(json!([]))));
        }
    }

    #[test]
    fn test_wildcard_matches_mixed_arrays() {
        let tag: IsTag = "any[]".parse().unwrap();
        assert!(tag.matches(&v(json!([1, "a", {"b": true}]))));
        assert!(tag.matches(&v(json!([1, null]))));
        assert!(!tag.matches(&v(json!({"a": 1}))));
    }

    #[test]
    fn test_date_strings_match_date_tags() {
        let scalar: IsTag = "date".parse().unwrap();
        let array: IsTag = "date[]".parse().unwrap();
        let iso = DateFormat::Iso;

        assert!(scalar.matches_with_date_strings(&v(json!("2000-01-01T00:00:00.000Z")), iso));
        assert!(!scalar.matches_with_date_strings(&v(json!("2000-01-01")), iso));
        assert!(array.matches_with_date_strings(&v(json!(["2000-01-01T00:00:00.000Z"])), iso));
        assert!(!array.matches_with_date_strings(&v(json!(["2000-01-01T00:00:00.000Z", 1])), iso));
        assert!(!array.matches_with_date_strings(&v(json!("2000-01-01T00:00:00.000Z")), iso));

        let number: IsTag = "number".parse().unwrap();
        assert!(!number.matches_with_date_strings(&v(json!("2000-01-01T00:00:00.000Z")), iso));
        assert!(number.matches_with_date_strings(&v(json!(3)), iso));
    }

    #[test]
    fn test_uniformity() {
        assert!(is_uniform_array(&[]));
        assert!(is_uniform_array(v(json!(["a", "b"])).as_array().unwrap()));
        assert!(!is_uniform_array(v(json!(["a", 1])).as_array().unwrap()));
        assert!(!is_uniform_array(v(json!([1, null])).as_array().unwrap()));
    }
}
