use serde_json::Value;

/// Folds `patch` into `base` and returns the result, leaving both inputs
/// untouched.
///
/// Two objects merge key by key; every other pairing (scalars, arrays,
/// and type mismatches) takes the patch value wholesale. Keys the base
/// does not contain are dropped, so a merge can never widen the document
/// shape. Arrays are never merged element-wise here; catalogs
/// that need id-preserving list reconciliation go through the
/// reconciliation engine instead.
pub fn deep_merge(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            let mut merged = serde_json::Map::with_capacity(base_map.len());
            for (key, base_value) in base_map {
                let value = match patch_map.get(key) {
                    Some(patch_value) => deep_merge(base_value, patch_value),
                    None => base_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        _ => patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_nested_objects() {
        let base = json!({"a": {"x": 1, "y": 2}, "b": "keep"});
        let patch = json!({"a": {"y": 20}});
        let merged = deep_merge(&base, &patch);
        assert_eq!(merged, json!({"a": {"x": 1, "y": 20}, "b": "keep"}));
    }

    #[test]
    fn never_adds_unknown_keys() {
        let base = json!({"known": 1});
        let patch = json!({"known": 2, "invented": "nope", "nested": {"also": "no"}});
        let merged = deep_merge(&base, &patch);
        assert_eq!(merged, json!({"known": 2}));
    }

    #[test]
    fn replaces_arrays_wholesale() {
        let base = json!({"list": [1, 2, 3]});
        let patch = json!({"list": [9]});
        let merged = deep_merge(&base, &patch);
        assert_eq!(merged, json!({"list": [9]}));
    }

    #[test]
    fn patch_replaces_on_type_mismatch() {
        let base = json!({"value": {"deep": true}});
        let patch = json!({"value": "flat"});
        let merged = deep_merge(&base, &patch);
        assert_eq!(merged, json!({"value": "flat"}));
    }

    #[test]
    fn keys_missing_from_patch_are_retained() {
        let base = json!({"a": 1, "b": {"c": 2}});
        let patch = json!({});
        assert_eq!(deep_merge(&base, &patch), base);
    }
}
