//! Field-path flattening over JSON payloads.
//!
//! Source payloads are `serde_json::Value` trees. Conflict detection works on
//! flattened field paths: object members become dotted segments, array
//! elements are addressed by index (`items.0.name`), and a scalar payload
//! maps to the single root path `""`. Empty arrays and objects are treated as
//! leaves so flattening round-trips them.
//!
//! Equality between candidate values is `serde_json::Value` equality, which
//! compares objects by key set rather than insertion order. Two payloads that
//! differ only in key ordering are therefore never reported as a conflict.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Flatten a payload into `(field path, leaf value)` pairs.
///
/// Paths are deterministic: `BTreeMap` ordering keeps downstream iteration
/// reproducible across runs.
pub fn flatten(value: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(child, path, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                let path = if prefix.is_empty() {
                    index.to_string()
                } else {
                    format!("{}.{}", prefix, index)
                };
                flatten_into(child, path, out);
            }
        }
        leaf => {
            out.insert(prefix, leaf.clone());
        }
    }
}

/// Rebuild a payload from flattened field paths.
///
/// Inverse of [`flatten`] for the paths it produces. A lone root path (`""`)
/// rebuilds the scalar directly; numeric segments rebuild array positions,
/// padding skipped indices with null.
pub fn unflatten(fields: &BTreeMap<String, Value>) -> Value {
    if fields.is_empty() {
        return Value::Object(Map::new());
    }
    if fields.len() == 1 {
        if let Some(value) = fields.get("") {
            return value.clone();
        }
    }

    let mut root = seed_container(fields.keys().next().map(String::as_str).unwrap_or(""));
    for (path, value) in fields {
        insert_path(&mut root, path, value.clone());
    }
    root
}

fn seed_container(first_path: &str) -> Value {
    let first_segment = first_path.split('.').next().unwrap_or("");
    if first_segment.parse::<usize>().is_ok() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn insert_path(target: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = target;
    for (i, segment) in segments.iter().enumerate() {
        let last = i == segments.len() - 1;
        match segment.parse::<usize>() {
            Ok(index) => {
                if !current.is_array() {
                    *current = Value::Array(Vec::new());
                }
                let items = current.as_array_mut().unwrap();
                while items.len() <= index {
                    items.push(Value::Null);
                }
                if last {
                    items[index] = value;
                    return;
                }
                if items[index].is_null() {
                    items[index] = seed_container(segments[i + 1]);
                }
                current = &mut items[index];
            }
            Err(_) => {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                let map = current.as_object_mut().unwrap();
                if last {
                    map.insert(segment.to_string(), value);
                    return;
                }
                current = map
                    .entry(segment.to_string())
                    .or_insert_with(|| seed_container(segments[i + 1]));
                if current.is_null() {
                    *current = seed_container(segments[i + 1]);
                }
            }
        }
    }
}

/// Runtime type tag of a value, used for conflict type classification.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a value carries meaningful content: non-null and, for strings,
/// arrays, and objects, non-empty.
pub fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}
