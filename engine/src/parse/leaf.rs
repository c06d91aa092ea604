//! Leaf coercions from raw strings.

use shapecheck_core::{PrimitiveType, Value};

/// Strings read as `true`. The check mark is the query-string convention,
/// `1` the bulk-upload one.
pub const TRUE_LITERALS: [&str; 3] = ["✓", "1", "true"];

/// Strings read as `false`.
pub const FALSE_LITERALS: [&str; 3] = ["✕", "0", "false"];

pub(crate) fn boolean(raw: &str) -> Option<bool> {
    if TRUE_LITERALS.contains(&raw) {
        Some(true)
    } else if FALSE_LITERALS.contains(&raw) {
        Some(false)
    } else {
        None
    }
}

/// Parses a number and checks the integer/sign constraints of `ty`.
pub(crate) fn number(ty: PrimitiveType, raw: &str) -> Option<Value> {
    let n: f64 = raw.trim().parse().ok()?;
    if !ty.accepts_number(n) {
        return None;
    }
    Value::from_f64(n)
}
