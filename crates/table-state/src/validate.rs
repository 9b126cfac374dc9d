//! Shape checks applied to persisted values before they are trusted.

use std::collections::BTreeMap;

use serde_json::Value;

/// Legacy presence rule: `null`, `""`, `0` and `false` all count as
/// "nothing persisted".
/// Objects and arrays are always present, empty ones included.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Strict check for ColumnVisibility / RowSelection: an object whose values
/// are all booleans. A single non-boolean entry invalidates the whole value,
/// it is never partially accepted.
pub fn as_bool_map(value: &Value) -> Option<BTreeMap<String, bool>> {
    let obj = value.as_object()?;
    let mut out = BTreeMap::new();
    for (key, v) in obj {
        out.insert(key.clone(), v.as_bool()?);
    }
    Some(out)
}

/// Numbers persisted to the URL arrive back as strings; accept both.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-negative integer (page index, page size).
pub fn as_index(value: &Value) -> Option<usize> {
    let f = as_number(value)?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 {
        Some(f as usize)
    } else {
        None
    }
}

pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
