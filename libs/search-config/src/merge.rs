//! Pure overlay merge for configuration trees

use serde_json::{Map, Value};

/// Overlay `top` onto `base` and return the merged tree.
///
/// Objects merge key by key (recursively); any other value in `top` replaces
/// the one in `base`. `null` in `top` counts as unset and never removes a key.
pub fn overlay(base: &Value, top: &Value) -> Value {
    match (base, top) {
        (_, Value::Null) => base.clone(),
        (Value::Object(base_map), Value::Object(top_map)) => {
            let mut merged = base_map.clone();
            for (key, top_value) in top_map {
                let next = match merged.get(key) {
                    Some(existing) => overlay(existing, top_value),
                    None if top_value.is_null() => continue,
                    None => top_value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        _ => top.clone(),
    }
}

/// Overlay into an accumulator map in place of building a new value.
pub(crate) fn overlay_into(target: &mut Map<String, Value>, top: &Value) {
    if let Value::Object(top_map) = top {
        for (key, top_value) in top_map {
            let next = match target.get(key) {
                Some(existing) => overlay(existing, top_value),
                None if top_value.is_null() => continue,
                None => top_value.clone(),
            };
            target.insert(key.clone(), next);
        }
    }
}

/// Copy of an object without the given key (used to drop `service` subtrees).
pub(crate) fn without_key(value: &Value, key: &str) -> Value {
    match value {
        Value::Object(map) => {
            let mut copy = map.clone();
            copy.remove(key);
            Value::Object(copy)
        }
        other => other.clone(),
    }
}
