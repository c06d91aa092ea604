//! `oneOfType` resolution while parsing.
//!
//! Unlike validation, a parser sees raw strings, so a variation matches a
//! string when its body *could parse* it (`"12"` fits a `number` branch).
//! In flat mode a string starting with `[` or `{` is first considered as
//! JSON text for an array or object branch; if a string branch could also
//! produce such a value, the input is ambiguous and nothing is guessed.

use shapecheck_core::{DataPath, ErrorKind, ParseError, TagKind, Unresolved, Value, resolve_variant};
use tracing::debug;

use super::{Mode, Parser};
use crate::plan::{CompiledVariation, Shape};

impl Parser {
    pub(super) fn union(
        &self,
        variations: &[CompiledVariation],
        slot: &mut Value,
        mode: Mode,
        path: &DataPath,
    ) -> Result<(), ParseError> {
        if mode != Mode::Structured {
            if let Some(opener) = slot.as_str().and_then(bracket_opener) {
                if variations.iter().any(|variation| accepts_container(variation, opener)) {
                    return self.decode_bracketed(variations, slot, opener, path);
                }
            }
        }
        self.resolve(variations, slot, mode, path)
    }

    fn decode_bracketed(
        &self,
        variations: &[CompiledVariation],
        slot: &mut Value,
        opener: char,
        path: &DataPath,
    ) -> Result<(), ParseError> {
        let noun = if opener == '[' { "an array" } else { "an object" };
        if variations.iter().any(|variation| text_clash(variation, opener)) {
            return Err(ParseError::new(
                ErrorKind::Ambiguous,
                path,
                slot,
                format!("{} could be text or {noun} encoded as JSON", path.label()),
            ));
        }
        if let Value::String(raw) = slot {
            let json: serde_json::Value = serde_json::from_str(raw).map_err(|err| {
                ParseError::new(
                    ErrorKind::Invalid,
                    path,
                    &Value::String(raw.clone()),
                    format!("{} must be {noun} encoded as JSON: {err}", path.label()),
                )
            })?;
            *slot = Value::from(json);
        }
        self.resolve(variations, slot, Mode::Structured, path)
    }

    fn resolve(
        &self,
        variations: &[CompiledVariation],
        slot: &mut Value,
        mode: Mode,
        path: &DataPath,
    ) -> Result<(), ParseError> {
        let value: &Value = slot;
        let resolved = if self.options.parse_dates_only {
            // Only date branches read strings here; everything else keeps its native shape.
            let format = self.options.date_format;
            resolve_variant(
                variations,
                value,
                |variation| variation.tag.matches_with_date_strings(value, format),
                |_| true,
            )
        } else {
            self.resolve_raw(variations, value)
        };

        match resolved {
            Ok(index) => {
                debug!(path = %path, variation = variations[index].description(), "Resolved type variation");
                self.shape(&variations[index].body.shape, slot, mode, path)
            }
            Err(Unresolved::NoMatch) if self.options.parse_dates_only => Ok(()),
            Err(Unresolved::NoMatch) if slot.as_str() == Some("") => {
                *slot = Value::Null;
                Ok(())
            }
            Err(Unresolved::Ambiguous(candidates)) => {
                let names = candidates
                    .iter()
                    .map(|&i| format!("\"{}\"", variations[i].description()))
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(ParseError::new(
                    ErrorKind::Ambiguous,
                    path,
                    slot,
                    format!(
                        "{} could be parsed as more than one type variation: {names}",
                        path.label()
                    ),
                ))
            }
            Err(Unresolved::NoMatch) => Err(ParseError::new(
                ErrorKind::Unsupported,
                path,
                slot,
                format!("{} does not match any supported type variation", path.label()),
            )),
        }
    }

    /// Matches raw input: strings by whether a branch could parse them.
    fn resolve_raw(&self, variations: &[CompiledVariation], value: &Value) -> Result<usize, Unresolved> {
        match value {
            Value::String(raw) => resolve_variant(
                variations,
                value,
                |variation| is_scalar_tag(variation) && self.could_parse(&variation.body.shape, raw),
                |_| true,
            ),
            Value::Array(items) => resolve_variant(
                variations,
                value,
                |variation| {
                    variation.tag.array
                        && items.iter().all(|item| {
                            variation.tag.element().matches(item)
                                || item.as_str().is_some_and(|raw| {
                                    self.could_parse(element_shape(&variation.body.shape), raw)
                                })
                        })
                },
                |_| true,
            ),
            other => resolve_variant(variations, other, |variation| variation.tag.matches(other), |_| true),
        }
    }

    /// Whether a scalar body accepts `raw`.
    fn could_parse(&self, shape: &Shape, raw: &str) -> bool {
        let scratch = DataPath::root();
        match shape {
            Shape::Any => true,
            Shape::Typed(ty) if raw.is_empty() => super::is_string_like(ty),
            Shape::Typed(ty) => self.coerce(ty, raw, &scratch).is_ok(),
            Shape::Hooked(name) => !raw.is_empty() && self.run_hook(name, raw, &scratch).is_ok(),
            Shape::OneOf(set) => {
                let candidate =
                    super::coerce_literal(set, raw).unwrap_or_else(|| Value::String(raw.to_string()));
                set.contains(&candidate)
            }
            Shape::Union(inner) => inner
                .iter()
                .any(|variation| is_scalar_tag(variation) && self.could_parse(&variation.body.shape, raw)),
            Shape::ArrayOf { .. } | Shape::ObjectOf { .. } | Shape::Object { .. } => false,
        }
    }
}

fn bracket_opener(raw: &str) -> Option<char> {
    raw.chars().next().filter(|c| matches!(c, '[' | '{'))
}

fn is_scalar_tag(variation: &CompiledVariation) -> bool {
    !variation.tag.array && variation.tag.kind != TagKind::Object
}

fn accepts_container(variation: &CompiledVariation, opener: char) -> bool {
    match opener {
        '[' => variation.tag.array,
        _ => variation.tag.is_object() && !variation.tag.array,
    }
}

/// Whether a string branch could legitimately yield text starting with
/// `opener`. Free-form strings always could; `oneOf` lists only when a
/// literal does.
fn text_clash(variation: &CompiledVariation, opener: char) -> bool {
    if variation.tag.array || variation.tag.kind != TagKind::String {
        return false;
    }
    shape_yields_text(&variation.body.shape, opener)
}

fn shape_yields_text(shape: &Shape, opener: char) -> bool {
    match shape {
        Shape::Any | Shape::Typed(_) | Shape::Hooked(_) => true,
        Shape::OneOf(set) => set
            .members
            .iter()
            .any(|member| member.as_str().is_some_and(|s| s.starts_with(opener))),
        Shape::Union(inner) => inner.iter().any(|variation| text_clash(variation, opener)),
        Shape::ArrayOf { .. } | Shape::ObjectOf { .. } | Shape::Object { .. } => false,
    }
}

/// Element shape of an array body; other bodies stand for themselves.
fn element_shape(shape: &Shape) -> &Shape {
    match shape {
        Shape::ArrayOf { element, .. } => &element.shape,
        other => other,
    }
}
