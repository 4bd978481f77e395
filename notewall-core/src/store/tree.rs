//! Path operations over a JSON tree.
//!
//! Paths are `/`-separated keys. `null` means "absent": writing `null`
//! deletes, null members are dropped on write, and objects left empty by a
//! delete are pruned up to (but not including) the root.

use serde_json::{Map, Value};

pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Value at `path`, `None` when absent.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for key in segments(path) {
        node = node.as_object()?.get(key)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Full overwrite of the subtree at `path`.
pub fn set(root: &mut Value, path: &str, value: Value) {
    let value = normalize(value);
    if value.is_null() {
        remove(root, path);
        return;
    }

    let keys = segments(path);
    let Some((last, parents)) = keys.split_last() else {
        *root = if value.is_object() { value } else { Value::Object(Map::new()) };
        return;
    };

    let mut node = root;
    for key in parents {
        node = ensure_object(node)
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.to_string(), value);
}

/// Merge `fields` into the object at `path`; siblings are untouched and a
/// `null` field removes that key.
pub fn patch(root: &mut Value, path: &str, fields: Map<String, Value>) {
    let base = segments(path).join("/");
    for (key, value) in fields {
        let child = if base.is_empty() { key } else { format!("{}/{}", base, key) };
        set(root, &child, value);
    }
}

/// Remove the subtree at `path`. Removing the root clears it to `{}`.
pub fn remove(root: &mut Value, path: &str) {
    let keys = segments(path);
    if keys.is_empty() {
        *root = Value::Object(Map::new());
        return;
    }
    remove_at(root, &keys);
}

// Returns true when `node` became empty and should be pruned by its parent.
fn remove_at(node: &mut Value, keys: &[&str]) -> bool {
    let Some(map) = node.as_object_mut() else {
        return false;
    };
    match keys {
        [] => false,
        [last] => {
            map.remove(*last);
            map.is_empty()
        }
        [first, rest @ ..] => {
            let prune = match map.get_mut(*first) {
                Some(child) => remove_at(child, rest),
                None => false,
            };
            if prune {
                map.remove(*first);
            }
            map.is_empty()
        }
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

/// Drop null members and the empty objects they leave behind.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if cleaned.is_empty() {
                Value::Null
            } else {
                Value::Object(cleaned)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}
