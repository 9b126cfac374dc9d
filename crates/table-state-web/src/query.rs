//! Query-string codec for the URL bucket.
//!
//! One table's keys live under an optional namespace prefix
//! (`?test-table.age=25&test-table.page=0`); pairs outside the namespace
//! belong to other tables or the router and are preserved untouched on
//! every write. Composite values (ranges, objects) are JSON-encoded and
//! percent-encoded; scalars stay plain strings.

use std::collections::BTreeMap;

use serde_json::Value;
use table_state::Snapshot;

/// Decode a raw search string (with or without leading `?`) into flat pairs.
/// Malformed input degrades to an empty map, it never errors.
pub fn decode_pairs(search: &str) -> BTreeMap<String, String> {
    let trimmed = search.trim_start_matches('?');
    if trimmed.is_empty() {
        return BTreeMap::new();
    }
    serde_qs::from_str(trimmed).unwrap_or_default()
}

fn namespace_prefix(namespace: Option<&str>) -> String {
    namespace.map(|ns| format!("{ns}.")).unwrap_or_default()
}

/// A query value is JSON only when it looks like JSON; `25` stays the
/// string `"25"` so text filters round-trip verbatim.
fn parse_value(raw: &str) -> Value {
    if raw.starts_with('[') || raw.starts_with('{') {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    } else {
        Value::String(raw.to_string())
    }
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        composite => serde_json::to_string(composite).unwrap_or_default(),
    }
}

/// Extract this table's snapshot from the full search string.
pub fn parse_query(search: &str, namespace: Option<&str>) -> Snapshot {
    let prefix = namespace_prefix(namespace);
    decode_pairs(search)
        .into_iter()
        .filter_map(|(key, value)| {
            let own = key.strip_prefix(&prefix)?;
            Some((own.to_string(), parse_value(&value)))
        })
        .collect()
}

/// Rebuild the search string: replace every pair under our namespace with
/// the snapshot's contents, keep all foreign pairs. Returns the string
/// without the leading `?`; empty when nothing is left.
pub fn build_query(current_search: &str, namespace: Option<&str>, snapshot: &Snapshot) -> String {
    let prefix = namespace_prefix(namespace);
    let mut pairs = decode_pairs(current_search);
    if prefix.is_empty() {
        // Without a namespace the whole query belongs to this table.
        pairs.clear();
    } else {
        pairs.retain(|key, _| !key.starts_with(&prefix));
    }
    for (key, value) in snapshot {
        pairs.insert(format!("{prefix}{key}"), encode_value(value));
    }
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
