//! Schema description model.
//!
//! A schema is a tree of [`SchemaNode`]s. A node is either a full
//! [`SchemaEntry`] (recognized by at least one keyword key such as `type`,
//! `schema` or `description`) or an *inline* property map, which is sugar for
//! a required nested object without a description.
//!
//! The model deserializes from JSON or YAML through [`serde_json::Value`], so
//! both authoring formats share the same keyword detection.
//!
//! # Examples
//!
//! ```
//! use shapecheck_core::{SchemaNode, SchemaRef};
//! use serde_json::json;
//!
//! let node = SchemaNode::from_json(json!({
//!     "description": "A user",
//!     "schema": {
//!         "name": {"description": "Display name", "type": "string"},
//!         "address": {"city": {"description": "City", "type": "string"}}
//!     }
//! }))
//! .unwrap();
//!
//! let entry = node.as_entry().unwrap();
//! let Some(SchemaRef::Node(properties)) = &entry.schema else { panic!() };
//! let properties = properties.as_inline().unwrap();
//! assert!(properties["name"].as_entry().is_some());
//! assert!(properties["address"].as_inline().is_some());
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::condition::Condition;
use crate::error::SchemaDefinitionError;

/// Keys whose presence marks a mapping as a full schema entry.
pub const ENTRY_KEYWORDS: &[&str] = &[
    "description",
    "type",
    "oneOf",
    "arrayOf",
    "objectOf",
    "oneOfType",
    "schema",
    "extends",
];

/// Property name to schema node.
pub type PropertyMap = IndexMap<String, SchemaNode>;

/// One node of a schema tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaNode {
    /// Full entry with keywords.
    Entry(Box<SchemaEntry>),
    /// Bare property map (implicitly required nested object).
    Inline(PropertyMap),
}

/// `required` modifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Required {
    /// Always (`true`) or never (`false`) required.
    Static(bool),
    /// Required when the condition holds against the sibling properties.
    When { when: Condition },
}

/// Value of a `schema` or `extends` key before normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaRef {
    /// Name of a schema in the caller-supplied lookup table.
    Named(String),
    /// Directly written node.
    Node(Box<SchemaNode>),
}

/// Element type of `arrayOf` / value type of `objectOf`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ElementSchema {
    /// Primitive type name, e.g. `"string"`.
    TypeName(String),
    /// Nested entry or inline object.
    Node(Box<SchemaNode>),
}

/// Full schema entry.
///
/// Exactly one shape key (`type`, `oneOf`, `arrayOf`, `objectOf`,
/// `oneOfType`, `schema`) is expected once the tree is normalized; `extends`
/// only exists before normalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Required>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// `type`; `Some(None)` is an explicit `type: null` (accept any value).
    #[serde(
        rename = "type",
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_of: Option<ElementSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_of: Option<ElementSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_one_of: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of_type: Option<Vec<TypeVariation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<SchemaRef>,
    /// Per-entry override of the global empty-array allowance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_empty: Option<bool>,
    /// Object must have no keys at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty: Option<bool>,
}

/// One branch of a `oneOfType` union.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeVariation {
    /// Native-type discriminator (`string`, `object[]`, `any[]`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is: Option<String>,
    /// Guard, only meaningful on object variations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
    /// Shape of the value once this variation is selected.
    #[serde(flatten)]
    pub entry: SchemaEntry,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn malformed(err: impl std::fmt::Display) -> SchemaDefinitionError {
    SchemaDefinitionError::Malformed(err.to_string())
}

impl SchemaNode {
    /// Reads a node, deciding between entry and inline map by keyword keys.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaDefinitionError::Malformed`] for non-object input and
    /// unknown keys inside an entry, and propagates condition errors.
    pub fn from_json(raw: serde_json::Value) -> Result<Self, SchemaDefinitionError> {
        let serde_json::Value::Object(map) = raw else {
            return Err(malformed(format!("schema node must be an object, got {raw}")));
        };
        if map.keys().any(|key| ENTRY_KEYWORDS.contains(&key.as_str())) {
            let entry: SchemaEntry =
                serde_json::from_value(serde_json::Value::Object(map)).map_err(malformed)?;
            return Ok(SchemaNode::Entry(Box::new(entry)));
        }
        let mut properties = PropertyMap::with_capacity(map.len());
        for (key, value) in map {
            properties.insert(key, SchemaNode::from_json(value)?);
        }
        Ok(SchemaNode::Inline(properties))
    }

    /// Renders the node back to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn entry(entry: SchemaEntry) -> Self {
        SchemaNode::Entry(Box::new(entry))
    }

    pub fn as_entry(&self) -> Option<&SchemaEntry> {
        match self {
            SchemaNode::Entry(entry) => Some(entry),
            SchemaNode::Inline(_) => None,
        }
    }

    pub fn as_inline(&self) -> Option<&PropertyMap> {
        match self {
            SchemaNode::Inline(map) => Some(map),
            SchemaNode::Entry(_) => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.as_entry().and_then(|entry| entry.description.as_deref())
    }
}

impl SchemaEntry {
    /// Entry of primitive type `name`.
    pub fn typed(description: &str, name: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            type_name: Some(Some(name.to_string())),
            ..Self::default()
        }
    }

    /// Entry describing a nested object with the given properties.
    pub fn object(description: &str, properties: PropertyMap) -> Self {
        Self {
            description: Some(description.to_string()),
            schema: Some(SchemaRef::Node(Box::new(SchemaNode::Inline(properties)))),
            ..Self::default()
        }
    }

    /// Sets the static `required` flag.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(Required::Static(required));
        self
    }

    /// `type` name when set to a concrete type.
    pub fn type_str(&self) -> Option<&str> {
        self.type_name.as_ref().and_then(|name| name.as_deref())
    }

    /// Number of shape keys present (`type`, `oneOf`, ... `schema`).
    pub fn shape_count(&self) -> usize {
        [
            self.type_name.is_some(),
            self.one_of.is_some(),
            self.array_of.is_some(),
            self.object_of.is_some(),
            self.one_of_type.is_some(),
            self.schema.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        SchemaNode::from_json(raw).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Required {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::Bool(b) => Ok(Required::Static(b)),
            serde_json::Value::Object(mut map) if map.len() == 1 && map.contains_key("when") => {
                let when = map.remove("when").unwrap_or_default();
                Condition::from_json(&when)
                    .map(|when| Required::When { when })
                    .map_err(serde::de::Error::custom)
            }
            other => Err(serde::de::Error::custom(format!(
                "required must be a boolean or {{\"when\": ...}}, got {other}"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for SchemaRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::String(name) => Ok(SchemaRef::Named(name)),
            other => SchemaNode::from_json(other)
                .map(|node| SchemaRef::Node(Box::new(node)))
                .map_err(serde::de::Error::custom),
        }
    }
}

impl<'de> Deserialize<'de> for ElementSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::String(name) => Ok(ElementSchema::TypeName(name)),
            other => SchemaNode::from_json(other)
                .map(|node| ElementSchema::Node(Box::new(node)))
                .map_err(serde::de::Error::custom),
        }
    }
}

impl<'de> Deserialize<'de> for TypeVariation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let raw = serde_json::Value::deserialize(deserializer)?;
        let serde_json::Value::Object(mut map) = raw else {
            return Err(D::Error::custom("type variation must be an object"));
        };
        let is = match map.remove("is") {
            None => None,
            Some(serde_json::Value::String(tag)) => Some(tag),
            Some(other) => return Err(D::Error::custom(format!("is must be a string, got {other}"))),
        };
        let when = map
            .remove("when")
            .map(|raw| Condition::from_json(&raw))
            .transpose()
            .map_err(D::Error::custom)?;
        let entry =
            serde_json::from_value(serde_json::Value::Object(map)).map_err(D::Error::custom)?;
        Ok(TypeVariation { is, when, entry })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_keyword_decides_entry_vs_inline() {
        let entry = SchemaNode::from_json(json!({"type": "string"})).unwrap();
        assert!(entry.as_entry().is_some());

        let inline = SchemaNode::from_json(json!({"a": {"type": "string"}})).unwrap();
        assert!(inline.as_inline().is_some());
    }

    #[test]
    fn test_misspelled_keyword_falls_back_to_inline_map() {
        // `tpye` is not a keyword, so the mapping reads as an object whose
        // single property is itself malformed.
        let err = SchemaNode::from_json(json!({"tpye": "string"})).unwrap_err();
        assert!(matches!(err, SchemaDefinitionError::Malformed(_)));
    }

    #[test]
    fn test_unknown_entry_key_is_rejected() {
        let err = SchemaNode::from_json(json!({"description": "x", "tpye": "string"})).unwrap_err();
        assert!(matches!(err, SchemaDefinitionError::Malformed(_)));
    }

    #[test]
    fn test_type_null_is_kept_distinct_from_absent() {
        let node = SchemaNode::from_json(json!({"description": "x", "type": null})).unwrap();
        assert_eq!(node.as_entry().unwrap().type_name, Some(None));
        assert_eq!(node.to_json(), json!({"description": "x", "type": null}));
    }

    #[test]
    fn test_required_forms() {
        let node = SchemaNode::from_json(json!({
            "description": "x",
            "type": "string",
            "required": {"when": {"kind": "a"}}
        }))
        .unwrap();
        assert!(matches!(
            node.as_entry().unwrap().required,
            Some(Required::When { .. })
        ));
    }

    #[test]
    fn test_variation_splits_discriminator_fields() {
        let node = SchemaNode::from_json(json!({
            "description": "union",
            "oneOfType": [
                {"description": "a", "is": "object", "when": {"b": {"$exists": true}}, "schema": {}},
                {"description": "b", "is": "string", "type": "string"}
            ]
        }))
        .unwrap();
        let variations = node.as_entry().unwrap().one_of_type.as_ref().unwrap();
        assert_eq!(variations[0].is.as_deref(), Some("object"));
        assert!(variations[0].when.is_some());
        assert_eq!(variations[1].entry.type_str(), Some("string"));
    }

    #[test]
    fn test_round_trips_through_json() {
        let raw = json!({
            "description": "list",
            "arrayOf": {"description": "item", "schema": "Item"},
            "nonEmpty": false
        });
        let node = SchemaNode::from_json(raw.clone()).unwrap();
        assert_eq!(node.to_json(), raw);
    }
}
