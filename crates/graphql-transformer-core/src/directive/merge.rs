use serde_json::{Map, Value};

/// Merge provided directive arguments over their defaults.
///
/// The recursion follows the shape of the defaults: only keys whose default is an object are
/// merged key by key, and only when `deep` is set. Lists and scalars are always replaced, and an
/// explicit `null` replaces the default as well.
pub fn merge_with_defaults(
    mut defaults: Map<String, Value>,
    provided: Map<String, Value>,
    deep: bool,
) -> Map<String, Value> {
    for (key, value) in provided {
        match (defaults.get_mut(&key), value) {
            (Some(Value::Object(default)), Value::Object(value)) if deep => {
                let nested = merge_with_defaults(std::mem::take(default), value, deep);
                *default = nested;
            }
            (_, value) => {
                defaults.insert(key, value);
            }
        }
    }

    defaults
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn nested_objects_merge_recursively_and_lists_replace() {
        let defaults = object(json!({
            "subscriptions": { "level": "on", "onCreate": ["onCreateTodo"] },
            "timestamps": { "createdAt": "createdAt", "updatedAt": "updatedAt" },
        }));
        let provided = object(json!({
            "subscriptions": { "onCreate": ["todoCreated"] },
            "timestamps": { "updatedAt": null },
        }));

        let merged = merge_with_defaults(defaults, provided, true);

        assert_eq!(
            Value::Object(merged),
            json!({
                "subscriptions": { "level": "on", "onCreate": ["todoCreated"] },
                "timestamps": { "createdAt": "createdAt", "updatedAt": null },
            })
        );
    }

    #[test]
    fn shallow_merge_replaces_top_level_keys() {
        let defaults = object(json!({ "timestamps": { "createdAt": "createdAt", "updatedAt": "updatedAt" } }));
        let provided = object(json!({ "timestamps": { "updatedAt": "modifiedAt" } }));

        let merged = merge_with_defaults(defaults, provided, false);

        assert_eq!(Value::Object(merged), json!({ "timestamps": { "updatedAt": "modifiedAt" } }));
    }
}
