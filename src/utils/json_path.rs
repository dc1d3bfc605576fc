//! Dotted-path lookups into parsed APIC documents
//!
//! APIC payloads are deeply nested (`imdata.0.topSystem.children.0.healthInst...`)
//! and not every object carries every attribute. Lookups return `Option` so a
//! missing field stays distinguishable from an empty string.

use serde_json::Value;

/// Resolve a dotted path against a JSON value
///
/// Each segment selects an object key, or an array index when the current
/// node is an array and the segment parses as `usize`. An empty path returns
/// the value itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    path.split('.').try_fold(value, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Resolve a path to its string form
///
/// Strings are returned as-is and numbers/booleans in their JSON spelling.
/// Objects, arrays, null and absent paths yield `None`.
pub fn lookup_str(value: &Value, path: &str) -> Option<String> {
    match lookup(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Resolve a path to a slice of records
///
/// Anything other than an array (including an absent path) is an empty slice.
pub fn lookup_array<'a>(value: &'a Value, path: &str) -> &'a [Value] {
    lookup(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
