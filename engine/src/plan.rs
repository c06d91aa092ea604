//! Compiled schema plan.
//!
//! A [`Plan`] is the normalized schema tree with every type name resolved,
//! every `oneOf` list checked, and every `oneOfType` union compiled into
//! [`CompiledVariation`]s. Both engines walk the same plan; the only deferred
//! node is [`Shape::Union`], which is resolved against each runtime value.
//!
//! Compilation is where schema mistakes surface. Nothing in a plan can fail
//! for reasons other than the data being walked.

use std::collections::HashMap;

use indexmap::IndexMap;
use shapecheck_core::{
    Condition, ElementSchema, IsTag, NativeType, PrimitiveType, PropertyMap, Required,
    SchemaDefinitionError, SchemaEntry, SchemaNode, SchemaRef, TagKind, TypeRef, TypeRegistry,
    TypeVariation, Value, Variant,
};
use tracing::debug;

/// Static or conditional requirement.
#[derive(Debug, Clone)]
pub enum RequiredRule {
    Static(bool),
    /// Tested against the object holding the property.
    When(Condition),
}

/// How an object's keys are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectMode {
    /// Only declared keys are allowed.
    Closed,
    /// `{}`: any object, contents unchecked.
    AnyObject,
    /// `empty: true`: the object must have no keys.
    Empty,
}

/// Homogeneous literal set of a `oneOf` entry.
#[derive(Debug, Clone)]
pub struct OneOfSet {
    pub kind: NativeType,
    pub members: Vec<Value>,
}

impl OneOfSet {
    pub fn contains(&self, value: &Value) -> bool {
        self.members.iter().any(|member| member.strict_eq(value))
    }

    /// Members joined for error messages.
    pub fn listing(&self) -> String {
        self.members
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Compiled shape of an entry.
#[derive(Debug, Clone)]
pub enum Shape {
    /// `type: null`: any value.
    Any,
    Typed(TypeRef),
    /// Type name left for the parser's `parse_property` hook.
    Hooked(String),
    OneOf(OneOfSet),
    ArrayOf {
        element: Box<PlanEntry>,
        non_empty: Option<bool>,
    },
    ObjectOf {
        value: Box<PlanEntry>,
        key_one_of: Option<Vec<String>>,
        key_type: Option<TypeRef>,
    },
    Object {
        fields: IndexMap<String, PlanEntry>,
        mode: ObjectMode,
    },
    Union(Vec<CompiledVariation>),
}

impl Shape {
    /// Shapes whose data is an array or object.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Shape::ArrayOf { .. } | Shape::ObjectOf { .. } | Shape::Object { .. }
        )
    }
}

/// One compiled schema entry.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub description: Option<String>,
    pub required: RequiredRule,
    pub nullable: Option<bool>,
    pub shape: Shape,
}

impl PlanEntry {
    fn required_leaf(shape: Shape) -> Self {
        Self {
            description: None,
            required: RequiredRule::Static(true),
            nullable: None,
            shape,
        }
    }

    /// Resolves the requirement against the object holding this entry.
    pub fn is_required(&self, parent: &Value) -> bool {
        match &self.required {
            RequiredRule::Static(required) => *required,
            RequiredRule::When(condition) => condition.test(parent),
        }
    }
}

/// One `oneOfType` branch with its discriminator and guard.
#[derive(Debug, Clone)]
pub struct CompiledVariation {
    pub tag: IsTag,
    pub when: Option<Condition>,
    /// The variation's own `required` is ignored; the union's applies.
    pub body: PlanEntry,
}

impl CompiledVariation {
    pub fn description(&self) -> &str {
        self.body.description.as_deref().unwrap_or_default()
    }

    /// Whether this branch accepts an empty array.
    pub fn tolerates_empty(&self, allow_empty_arrays: bool) -> bool {
        match &self.body.shape {
            Shape::ArrayOf {
                non_empty: Some(non_empty),
                ..
            } => !non_empty,
            _ => allow_empty_arrays,
        }
    }
}

impl Variant for CompiledVariation {
    fn is_tag(&self) -> IsTag {
        self.tag
    }

    fn guard(&self) -> Option<&Condition> {
        self.when.as_ref()
    }
}

/// A compiled schema.
#[derive(Debug, Clone)]
pub struct Plan {
    pub root: PlanEntry,
}

impl Plan {
    /// Compiles a normalized schema.
    ///
    /// With `allow_unresolved_types`, unknown type names compile to
    /// [`Shape::Hooked`] instead of failing.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaDefinitionError`] for unknown type names, invalid
    /// `oneOf` lists, malformed `oneOfType` variations, leftover references
    /// and entries without a shape.
    pub fn compile(
        node: &SchemaNode,
        registry: &TypeRegistry,
        allow_unresolved_types: bool,
    ) -> Result<Self, SchemaDefinitionError> {
        let compiler = Compiler {
            registry,
            allow_unresolved_types,
        };
        let root = compiler.node(node, "$")?;
        debug!(
            root = root.description.as_deref().unwrap_or("<inline>"),
            hooked = allow_unresolved_types,
            "Compiled schema plan"
        );
        Ok(Self { root })
    }
}

struct Compiler<'a> {
    registry: &'a TypeRegistry,
    allow_unresolved_types: bool,
}

impl Compiler<'_> {
    fn node(&self, node: &SchemaNode, path: &str) -> Result<PlanEntry, SchemaDefinitionError> {
        match node {
            SchemaNode::Inline(properties) => {
                Ok(PlanEntry::required_leaf(self.object(properties, false, path)?))
            }
            SchemaNode::Entry(entry) => self.entry(entry, path),
        }
    }

    fn entry(&self, entry: &SchemaEntry, path: &str) -> Result<PlanEntry, SchemaDefinitionError> {
        let required = match &entry.required {
            None => RequiredRule::Static(true),
            Some(Required::Static(required)) => RequiredRule::Static(*required),
            Some(Required::When { when }) => RequiredRule::When(when.clone()),
        };
        Ok(PlanEntry {
            description: entry.description.clone(),
            required,
            nullable: entry.nullable,
            shape: self.shape(entry, path)?,
        })
    }

    fn shape(&self, entry: &SchemaEntry, path: &str) -> Result<Shape, SchemaDefinitionError> {
        if entry.shape_count() > 1 {
            return Err(SchemaDefinitionError::ConflictingShapes {
                path: path.to_string(),
            });
        }
        if let Some(type_name) = &entry.type_name {
            return match type_name {
                None => Ok(Shape::Any),
                Some(name) => self.type_name(name, path),
            };
        }
        if let Some(literals) = &entry.one_of {
            return one_of_set(literals, path).map(Shape::OneOf);
        }
        if let Some(element) = &entry.array_of {
            return Ok(Shape::ArrayOf {
                element: Box::new(self.element(element, &format!("{path}.arrayOf"))?),
                non_empty: entry.non_empty,
            });
        }
        if let Some(value) = &entry.object_of {
            let key_type = entry
                .key_type
                .as_deref()
                .map(|name| self.resolve(name, &format!("{path}.keyType")))
                .transpose()?;
            return Ok(Shape::ObjectOf {
                value: Box::new(self.element(value, &format!("{path}.objectOf"))?),
                key_one_of: entry.key_one_of.clone(),
                key_type,
            });
        }
        if let Some(variations) = &entry.one_of_type {
            return self.union(variations, path).map(Shape::Union);
        }
        match &entry.schema {
            Some(SchemaRef::Node(node)) => match node.as_ref() {
                SchemaNode::Inline(properties) => {
                    self.object(properties, entry.empty == Some(true), path)
                }
                // A description-less wrapper left by the author: use its shape.
                SchemaNode::Entry(inner) => self.shape(inner, &format!("{path}.schema")),
            },
            Some(SchemaRef::Named(name)) => Err(SchemaDefinitionError::UnknownReference {
                name: name.clone(),
                path: format!("{path}.schema"),
            }),
            None if entry.empty == Some(true) => Ok(Shape::Object {
                fields: IndexMap::new(),
                mode: ObjectMode::Empty,
            }),
            None => Err(SchemaDefinitionError::MissingShape {
                path: path.to_string(),
            }),
        }
    }

    fn object(
        &self,
        properties: &PropertyMap,
        empty: bool,
        path: &str,
    ) -> Result<Shape, SchemaDefinitionError> {
        if empty {
            return Ok(Shape::Object {
                fields: IndexMap::new(),
                mode: ObjectMode::Empty,
            });
        }
        if properties.is_empty() {
            return Ok(Shape::Object {
                fields: IndexMap::new(),
                mode: ObjectMode::AnyObject,
            });
        }
        let mut fields = IndexMap::with_capacity(properties.len());
        for (name, node) in properties {
            fields.insert(name.clone(), self.node(node, &format!("{path}.{name}"))?);
        }
        Ok(Shape::Object {
            fields,
            mode: ObjectMode::Closed,
        })
    }

    fn element(&self, element: &ElementSchema, path: &str) -> Result<PlanEntry, SchemaDefinitionError> {
        match element {
            ElementSchema::TypeName(name) => Ok(PlanEntry::required_leaf(self.type_name(name, path)?)),
            ElementSchema::Node(node) => self.node(node, path),
        }
    }

    fn type_name(&self, name: &str, path: &str) -> Result<Shape, SchemaDefinitionError> {
        match self.registry.resolve(name) {
            Some(TypeRef::Primitive(PrimitiveType::Any)) => Ok(Shape::Any),
            Some(ty) => Ok(Shape::Typed(ty)),
            None if self.allow_unresolved_types => Ok(Shape::Hooked(name.to_string())),
            None => Err(SchemaDefinitionError::UnknownType {
                name: name.to_string(),
                path: path.to_string(),
            }),
        }
    }

    fn resolve(&self, name: &str, path: &str) -> Result<TypeRef, SchemaDefinitionError> {
        self.registry
            .resolve(name)
            .ok_or_else(|| SchemaDefinitionError::UnknownType {
                name: name.to_string(),
                path: path.to_string(),
            })
    }

    fn union(
        &self,
        variations: &[TypeVariation],
        path: &str,
    ) -> Result<Vec<CompiledVariation>, SchemaDefinitionError> {
        let mut defaults: HashMap<IsTag, usize> = HashMap::new();
        let mut compiled = Vec::with_capacity(variations.len());

        for (index, variation) in variations.iter().enumerate() {
            let variation_path = format!("{path}.oneOfType[{index}]");
            if variation.entry.description.is_none() {
                return Err(SchemaDefinitionError::VariationMissingField {
                    path: variation_path,
                    field: "description",
                });
            }
            let Some(raw_tag) = &variation.is else {
                return Err(SchemaDefinitionError::VariationMissingField {
                    path: variation_path,
                    field: "is",
                });
            };
            let tag: IsTag = raw_tag
                .parse()
                .map_err(|_| SchemaDefinitionError::InvalidDiscriminator {
                    tag: raw_tag.clone(),
                    path: variation_path.clone(),
                })?;
            if variation.when.is_some() && tag.kind != TagKind::Object {
                return Err(SchemaDefinitionError::WhenOnNonObject {
                    path: variation_path,
                });
            }
            if variation.when.is_none() {
                let count = defaults.entry(tag).or_default();
                *count += 1;
                if *count > 1 {
                    return Err(SchemaDefinitionError::AmbiguousVariations {
                        is: raw_tag.clone(),
                        path: path.to_string(),
                    });
                }
            }
            compiled.push(CompiledVariation {
                tag,
                when: variation.when.clone(),
                body: self.entry(&variation.entry, &variation_path)?,
            });
        }
        Ok(compiled)
    }
}

fn one_of_set(literals: &[serde_json::Value], path: &str) -> Result<OneOfSet, SchemaDefinitionError> {
    let invalid = |reason: &str| SchemaDefinitionError::InvalidOneOf {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    let mut members = Vec::with_capacity(literals.len());
    let mut kind = None;
    for literal in literals {
        let member = Value::from(literal.clone());
        let member_kind = match NativeType::of(&member) {
            Some(k @ (NativeType::String | NativeType::Number | NativeType::Boolean)) => k,
            _ => return Err(invalid("members must be strings, numbers or booleans")),
        };
        match kind {
            None => kind = Some(member_kind),
            Some(existing) if existing != member_kind => {
                return Err(invalid("members must all share one type"));
            }
            Some(_) => {}
        }
        members.push(member);
    }
    let kind = kind.ok_or_else(|| invalid("list must not be empty"))?;
    Ok(OneOfSet { kind, members })
}
