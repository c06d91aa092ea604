//! `oneOfType` resolution.
//!
//! Picks the single type variation a value belongs to. Resolution is a pure
//! function of the value and the variations' discriminators and guards, so
//! it is shared by the validation and parsing engines and can be tested
//! without compiling anything.
//!
//! Steps:
//!
//! 1. keep variations whose shape matches (by default the `is` tag's native
//!    match; engines may widen this, e.g. parsers accept `"12"` for `number`);
//! 2. keep variations whose `when` guard holds (whole value for `object`,
//!    every element for `object[]`);
//! 3. for arrays, prefer concrete `T[]` variations over `any[]` when the
//!    elements are uniform, and only `any[]` when they are not;
//! 4. one survivor wins; several are ambiguous unless the value is an empty
//!    array, where the first variation tolerating empty arrays is taken; none
//!    is a mismatch.

use crate::condition::Condition;
use crate::native::{IsTag, is_uniform_array};
use crate::value::Value;

/// A candidate branch as seen by the resolver.
pub trait Variant {
    fn is_tag(&self) -> IsTag;
    fn guard(&self) -> Option<&Condition>;
}

/// Why no single variation was selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    /// Indices of every remaining candidate.
    Ambiguous(Vec<usize>),
    NoMatch,
}

/// Evaluates a variation guard; variations without a guard always pass.
///
/// # Examples
///
/// ```
/// use shapecheck_core::{guard_passes, Condition, IsTag, Value};
/// use serde_json::json;
///
/// let when = Condition::from_json(&json!({"kind": "a"})).unwrap();
/// let tag: IsTag = "object[]".parse().unwrap();
/// let all_a = Value::from(json!([{"kind": "a"}, {"kind": "a"}]));
/// let mixed = Value::from(json!([{"kind": "a"}, {"kind": "b"}]));
///
/// assert!(guard_passes(tag, Some(&when), &all_a));
/// assert!(!guard_passes(tag, Some(&when), &mixed));
/// assert!(guard_passes(tag, None, &mixed));
/// ```
pub fn guard_passes(tag: IsTag, guard: Option<&Condition>, value: &Value) -> bool {
    let Some(condition) = guard else {
        return true;
    };
    if tag.array {
        value
            .as_array()
            .is_some_and(|items| items.iter().all(|item| condition.test(item)))
    } else {
        condition.test(value)
    }
}

/// Resolves `value` against `variations`.
///
/// `shape_matches` decides step 1; `tolerates_empty` reports whether a
/// variation accepts an empty array (entry-level `nonEmpty: false` or a
/// global allowance).
///
/// # Errors
///
/// Returns [`Unresolved::Ambiguous`] with the surviving indices, or
/// [`Unresolved::NoMatch`].
pub fn resolve_variant<V: Variant>(
    variations: &[V],
    value: &Value,
    shape_matches: impl Fn(&V) -> bool,
    tolerates_empty: impl Fn(&V) -> bool,
) -> Result<usize, Unresolved> {
    let mut candidates: Vec<usize> = variations
        .iter()
        .enumerate()
        .filter(|(_, variation)| {
            shape_matches(variation)
                && guard_passes(variation.is_tag(), variation.guard(), value)
        })
        .map(|(index, _)| index)
        .collect();

    if let Value::Array(items) = value {
        candidates = prefer_array_candidates(variations, candidates, items);
    }

    match candidates.as_slice() {
        [] => Err(Unresolved::NoMatch),
        [only] => Ok(*only),
        _ => {
            let is_empty_array = value.as_array().is_some_and(Vec::is_empty);
            if is_empty_array {
                if let Some(first) = candidates
                    .iter()
                    .copied()
                    .find(|&index| tolerates_empty(&variations[index]))
                {
                    return Ok(first);
                }
            }
            Err(Unresolved::Ambiguous(candidates))
        }
    }
}

/// Resolution by native shape only, as used by validators.
pub fn resolve_by_native<V: Variant>(
    variations: &[V],
    value: &Value,
    tolerates_empty: impl Fn(&V) -> bool,
) -> Result<usize, Unresolved> {
    resolve_variant(
        variations,
        value,
        |variation| variation.is_tag().matches(value),
        tolerates_empty,
    )
}

fn prefer_array_candidates<V: Variant>(
    variations: &[V],
    candidates: Vec<usize>,
    items: &[Value],
) -> Vec<usize> {
    let tag = |index: usize| variations[index].is_tag();
    if is_uniform_array(items) {
        let has_concrete = candidates.iter().any(|&i| tag(i).is_concrete_array());
        if has_concrete {
            return candidates
                .into_iter()
                .filter(|&i| !tag(i).is_wildcard_array())
                .collect();
        }
        candidates
    } else {
        candidates
            .into_iter()
            .filter(|&i| !tag(i).is_concrete_array())
            .collect()
    }
}
