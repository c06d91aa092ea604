//! Schema normalization.
//!
//! Turns an authored schema into canonical form in three full passes:
//!
//! 1. **Reference expansion**: every string-valued `schema`/`extends` is
//!    replaced by the named schema it refers to. A string `extends` without
//!    a sibling `description` gets a synthesized `Extends "<name>"`.
//! 2. **Extension**: `extends` is merged into the entry's own `schema`
//!    property map (own properties win on key collision), or pushed into
//!    every `oneOfType` variation and merged there.
//! 3. **Flattening**: `{schema: {description, schema: X}}` wrapper levels
//!    collapse into a single entry. The outer `description` and `required`
//!    are never overwritten by inner values.
//!
//! The input is never mutated. A schema already in canonical form (no
//! references, no `extends`, no wrapper levels) comes back borrowed; any
//! other schema is rebuilt by the passes. Normalization is idempotent, so
//! normalizing a normalized schema borrows it unchanged.
//!
//! # Examples
//!
//! ```
//! use std::borrow::Cow;
//! use std::collections::HashMap;
//! use shapecheck_core::{normalize, SchemaNode};
//! use serde_json::json;
//!
//! let mut named = HashMap::new();
//! named.insert(
//!     "Base".to_string(),
//!     SchemaNode::from_json(json!({"id": {"description": "Id", "type": "integer"}})).unwrap(),
//! );
//!
//! let schema = SchemaNode::from_json(json!({
//!     "description": "Item",
//!     "extends": "Base",
//!     "schema": {"name": {"description": "Name", "type": "string"}}
//! }))
//! .unwrap();
//!
//! let normalized = normalize(&schema, &named).unwrap();
//! assert_eq!(
//!     normalized.to_json(),
//!     json!({
//!         "description": "Item",
//!         "schema": {
//!             "id": {"description": "Id", "type": "integer"},
//!             "name": {"description": "Name", "type": "string"}
//!         }
//!     })
//! );
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::SchemaDefinitionError;
use crate::types::{ElementSchema, PropertyMap, SchemaEntry, SchemaNode, SchemaRef};

/// Caller-supplied lookup table for named schema references.
pub type NamedSchemas = HashMap<String, SchemaNode>;

/// Normalizes `node`, resolving references against `named`.
///
/// # Errors
///
/// Returns a [`SchemaDefinitionError`] for unknown or cyclic references and
/// for `extends` misuse. Data-shape problems are never reported here.
pub fn normalize<'a>(
    node: &'a SchemaNode,
    named: &NamedSchemas,
) -> Result<Cow<'a, SchemaNode>, SchemaDefinitionError> {
    if is_canonical(node) {
        tracing::debug!("Schema already normalized");
        return Ok(Cow::Borrowed(node));
    }
    let mut stack = Vec::new();
    let expanded = expand_node(node.clone(), named, "$", &mut stack)?;
    let extended = extend_node(expanded, "$")?;
    let flattened = flatten_node(extended);
    tracing::debug!(named = named.len(), "Normalized schema");
    Ok(Cow::Owned(flattened))
}

/// Normalizes the schema registered under `name`.
///
/// # Errors
///
/// Returns [`SchemaDefinitionError::UnknownReference`] when `name` is not
/// registered, plus any error [`normalize`] reports.
pub fn normalize_named(
    name: &str,
    named: &NamedSchemas,
) -> Result<SchemaNode, SchemaDefinitionError> {
    let node = named
        .get(name)
        .ok_or_else(|| SchemaDefinitionError::UnknownReference {
            name: name.to_string(),
            path: "$".to_string(),
        })?;
    normalize(node, named).map(Cow::into_owned)
}

/// Whether every pass would leave `node` as it is.
fn is_canonical(node: &SchemaNode) -> bool {
    match node {
        SchemaNode::Inline(properties) => properties.values().all(is_canonical),
        SchemaNode::Entry(entry) => is_canonical_entry(entry),
    }
}

fn is_canonical_entry(entry: &SchemaEntry) -> bool {
    let schema = match &entry.schema {
        None => true,
        Some(reference) if is_full_entry(reference) => false,
        Some(SchemaRef::Node(node)) => is_canonical(node),
        Some(SchemaRef::Named(_)) => false,
    };
    let element = |element: &ElementSchema| match element {
        ElementSchema::TypeName(_) => true,
        ElementSchema::Node(node) => is_canonical(node),
    };
    entry.extends.is_none()
        && schema
        && entry.array_of.iter().all(element)
        && entry.object_of.iter().all(element)
        && entry
            .one_of_type
            .iter()
            .flatten()
            .all(|variation| is_canonical_entry(&variation.entry))
}

fn child(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

// ---------------------------------------------------------------------------
// Pass 1: reference expansion
// ---------------------------------------------------------------------------

fn expand_node(
    node: SchemaNode,
    named: &NamedSchemas,
    path: &str,
    stack: &mut Vec<String>,
) -> Result<SchemaNode, SchemaDefinitionError> {
    match node {
        SchemaNode::Inline(properties) => {
            let mut expanded = PropertyMap::with_capacity(properties.len());
            for (key, value) in properties {
                let value = expand_node(value, named, &child(path, &key), stack)?;
                expanded.insert(key, value);
            }
            Ok(SchemaNode::Inline(expanded))
        }
        SchemaNode::Entry(entry) => Ok(SchemaNode::entry(expand_entry(*entry, named, path, stack)?)),
    }
}

fn expand_entry(
    mut entry: SchemaEntry,
    named: &NamedSchemas,
    path: &str,
    stack: &mut Vec<String>,
) -> Result<SchemaEntry, SchemaDefinitionError> {
    if let Some(schema) = entry.schema.take() {
        entry.schema = Some(expand_ref(schema, named, &child(path, "schema"), stack)?);
    }
    if let Some(extends) = entry.extends.take() {
        if let SchemaRef::Named(name) = &extends {
            if entry.description.is_none() {
                entry.description = Some(format!("Extends \"{name}\""));
            }
        }
        entry.extends = Some(expand_ref(extends, named, &child(path, "extends"), stack)?);
    }
    entry.array_of = entry
        .array_of
        .take()
        .map(|element| expand_element(element, named, &child(path, "arrayOf"), stack))
        .transpose()?;
    entry.object_of = entry
        .object_of
        .take()
        .map(|element| expand_element(element, named, &child(path, "objectOf"), stack))
        .transpose()?;
    if let Some(variations) = entry.one_of_type.as_mut() {
        for (index, variation) in variations.iter_mut().enumerate() {
            let variation_path = format!("{path}.oneOfType[{index}]");
            let body = std::mem::take(&mut variation.entry);
            variation.entry = expand_entry(body, named, &variation_path, stack)?;
        }
    }
    Ok(entry)
}

fn expand_ref(
    reference: SchemaRef,
    named: &NamedSchemas,
    path: &str,
    stack: &mut Vec<String>,
) -> Result<SchemaRef, SchemaDefinitionError> {
    let node = match reference {
        SchemaRef::Node(node) => expand_node(*node, named, path, stack)?,
        SchemaRef::Named(name) => {
            if stack.contains(&name) {
                return Err(SchemaDefinitionError::ReferenceCycle {
                    name,
                    path: path.to_string(),
                });
            }
            let target = named
                .get(&name)
                .ok_or_else(|| SchemaDefinitionError::UnknownReference {
                    name: name.clone(),
                    path: path.to_string(),
                })?;
            tracing::debug!(reference = %name, path, "Expanding schema reference");
            stack.push(name);
            let expanded = expand_node(target.clone(), named, path, stack);
            stack.pop();
            expanded?
        }
    };
    Ok(SchemaRef::Node(Box::new(node)))
}

fn expand_element(
    element: ElementSchema,
    named: &NamedSchemas,
    path: &str,
    stack: &mut Vec<String>,
) -> Result<ElementSchema, SchemaDefinitionError> {
    match element {
        ElementSchema::TypeName(name) => Ok(ElementSchema::TypeName(name)),
        ElementSchema::Node(node) => Ok(ElementSchema::Node(Box::new(expand_node(
            *node, named, path, stack,
        )?))),
    }
}

// ---------------------------------------------------------------------------
// Pass 2: extension
// ---------------------------------------------------------------------------

fn resolved(reference: SchemaRef, path: &str) -> Result<SchemaNode, SchemaDefinitionError> {
    match reference {
        SchemaRef::Node(node) => Ok(*node),
        SchemaRef::Named(name) => Err(SchemaDefinitionError::UnknownReference {
            name,
            path: path.to_string(),
        }),
    }
}

fn extend_node(node: SchemaNode, path: &str) -> Result<SchemaNode, SchemaDefinitionError> {
    match node {
        SchemaNode::Inline(properties) => {
            let mut extended = PropertyMap::with_capacity(properties.len());
            for (key, value) in properties {
                let value = extend_node(value, &child(path, &key))?;
                extended.insert(key, value);
            }
            Ok(SchemaNode::Inline(extended))
        }
        SchemaNode::Entry(entry) => Ok(SchemaNode::entry(extend_entry(*entry, path)?)),
    }
}

fn extend_entry(mut entry: SchemaEntry, path: &str) -> Result<SchemaEntry, SchemaDefinitionError> {
    let extends = entry.extends.take();

    if extends.is_some() {
        if let Some(variations) = &entry.one_of_type {
            for (index, variation) in variations.iter().enumerate() {
                let variation_path = format!("{path}.oneOfType[{index}]");
                if variation.entry.extends.is_some() {
                    return Err(SchemaDefinitionError::VariationExtends {
                        path: variation_path,
                    });
                }
                if variation.entry.description.is_none() {
                    return Err(SchemaDefinitionError::VariationMissingField {
                        path: variation_path,
                        field: "description",
                    });
                }
                if variation.entry.schema.is_none() {
                    return Err(SchemaDefinitionError::VariationMissingField {
                        path: variation_path,
                        field: "schema",
                    });
                }
            }
        }
    }

    // Children first, so nested extends are merged before this level.
    if let Some(schema) = entry.schema.take() {
        let schema_path = child(path, "schema");
        let node = extend_node(resolved(schema, &schema_path)?, &schema_path)?;
        entry.schema = Some(SchemaRef::Node(Box::new(node)));
    }
    entry.array_of = entry
        .array_of
        .take()
        .map(|element| extend_element(element, &child(path, "arrayOf")))
        .transpose()?;
    entry.object_of = entry
        .object_of
        .take()
        .map(|element| extend_element(element, &child(path, "objectOf")))
        .transpose()?;
    if let Some(variations) = entry.one_of_type.as_mut() {
        for (index, variation) in variations.iter_mut().enumerate() {
            let variation_path = format!("{path}.oneOfType[{index}]");
            let body = std::mem::take(&mut variation.entry);
            variation.entry = extend_entry(body, &variation_path)?;
        }
    }

    let Some(extends) = extends else {
        return Ok(entry);
    };
    let extends_path = child(path, "extends");
    let base = extend_node(resolved(extends, &extends_path)?, &extends_path)?;

    if let Some(variations) = entry.one_of_type.as_mut() {
        for (index, variation) in variations.iter_mut().enumerate() {
            let variation_path = format!("{path}.oneOfType[{index}]");
            merge_extension(&mut variation.entry, &base, &variation_path)?;
        }
        Ok(entry)
    } else if entry.schema.is_some() {
        merge_extension(&mut entry, &base, path)?;
        Ok(entry)
    } else {
        Err(SchemaDefinitionError::ExtendsWithoutSchema {
            path: path.to_string(),
        })
    }
}

fn extend_element(element: ElementSchema, path: &str) -> Result<ElementSchema, SchemaDefinitionError> {
    match element {
        ElementSchema::TypeName(name) => Ok(ElementSchema::TypeName(name)),
        ElementSchema::Node(node) => Ok(ElementSchema::Node(Box::new(extend_node(*node, path)?))),
    }
}

/// Merges `base` properties under `entry`'s own `schema` properties.
fn merge_extension(
    entry: &mut SchemaEntry,
    base: &SchemaNode,
    path: &str,
) -> Result<(), SchemaDefinitionError> {
    let own = match entry.schema.take() {
        Some(reference) => resolved(reference, path)?,
        None => {
            return Err(SchemaDefinitionError::ExtendsWithoutSchema {
                path: path.to_string(),
            });
        }
    };
    let own_properties = own_properties(own, path)?;
    let mut merged = extension_properties(base, path)?.clone();
    for (key, value) in own_properties {
        merged.insert(key, value);
    }
    entry.schema = Some(SchemaRef::Node(Box::new(SchemaNode::Inline(merged))));
    Ok(())
}

/// De-nests the entry's own `schema` down to its property map.
fn own_properties(node: SchemaNode, path: &str) -> Result<PropertyMap, SchemaDefinitionError> {
    match node {
        SchemaNode::Inline(properties) => Ok(properties),
        SchemaNode::Entry(entry) => {
            let entry = *entry;
            if entry.description.is_some() || entry.shape_count() != 1 {
                return Err(SchemaDefinitionError::ExtendsNonInlineSchema {
                    path: path.to_string(),
                });
            }
            match entry.schema {
                Some(reference) => own_properties(resolved(reference, path)?, path),
                None => Err(SchemaDefinitionError::ExtendsNonInlineSchema {
                    path: path.to_string(),
                }),
            }
        }
    }
}

/// De-nests the extension down to its property map.
fn extension_properties<'a>(
    node: &'a SchemaNode,
    path: &str,
) -> Result<&'a PropertyMap, SchemaDefinitionError> {
    match node {
        SchemaNode::Inline(properties) => Ok(properties),
        SchemaNode::Entry(entry) => match &entry.schema {
            Some(SchemaRef::Node(inner)) => extension_properties(inner, path),
            _ => Err(SchemaDefinitionError::ExtendsNotObject {
                path: path.to_string(),
            }),
        },
    }
}

// ---------------------------------------------------------------------------
// Pass 3: flattening
// ---------------------------------------------------------------------------

fn flatten_node(node: SchemaNode) -> SchemaNode {
    match node {
        SchemaNode::Inline(properties) => SchemaNode::Inline(
            properties
                .into_iter()
                .map(|(key, value)| (key, flatten_node(value)))
                .collect(),
        ),
        SchemaNode::Entry(entry) => SchemaNode::entry(flatten_entry(*entry)),
    }
}

fn is_full_entry(reference: &SchemaRef) -> bool {
    matches!(
        reference,
        SchemaRef::Node(node) if node.as_entry().is_some_and(|inner| inner.description.is_some())
    )
}

fn flatten_entry(mut entry: SchemaEntry) -> SchemaEntry {
    while entry.schema.as_ref().is_some_and(is_full_entry) {
        let Some(SchemaRef::Node(node)) = entry.schema.take() else {
            break;
        };
        let SchemaNode::Entry(inner) = *node else {
            break;
        };
        entry = merge_wrapper(entry, *inner);
    }

    entry.schema = entry.schema.take().map(|reference| match reference {
        SchemaRef::Node(node) => SchemaRef::Node(Box::new(flatten_node(*node))),
        named @ SchemaRef::Named(_) => named,
    });
    entry.extends = entry.extends.take().map(|reference| match reference {
        SchemaRef::Node(node) => SchemaRef::Node(Box::new(flatten_node(*node))),
        named @ SchemaRef::Named(_) => named,
    });
    entry.array_of = entry.array_of.take().map(flatten_element);
    entry.object_of = entry.object_of.take().map(flatten_element);
    if let Some(variations) = entry.one_of_type.as_mut() {
        for variation in variations.iter_mut() {
            let body = std::mem::take(&mut variation.entry);
            variation.entry = flatten_entry(body);
        }
    }
    entry
}

fn flatten_element(element: ElementSchema) -> ElementSchema {
    match element {
        ElementSchema::TypeName(name) => ElementSchema::TypeName(name),
        ElementSchema::Node(node) => ElementSchema::Node(Box::new(flatten_node(*node))),
    }
}

/// Collapses one wrapper level. `description` and `required` of the outer
/// entry win even when the inner entry also defines them; every other field
/// comes from the inner entry when it defines one.
fn merge_wrapper(outer: SchemaEntry, inner: SchemaEntry) -> SchemaEntry {
    SchemaEntry {
        description: outer.description.or(inner.description),
        required: outer.required.or(inner.required),
        nullable: inner.nullable.or(outer.nullable),
        type_name: inner.type_name.or(outer.type_name),
        one_of: inner.one_of.or(outer.one_of),
        array_of: inner.array_of.or(outer.array_of),
        object_of: inner.object_of.or(outer.object_of),
        key_one_of: inner.key_one_of.or(outer.key_one_of),
        key_type: inner.key_type.or(outer.key_type),
        one_of_type: inner.one_of_type.or(outer.one_of_type),
        schema: inner.schema,
        extends: inner.extends.or(outer.extends),
        non_empty: inner.non_empty.or(outer.non_empty),
        empty: inner.empty.or(outer.empty),
    }
}
