use std::collections::BTreeMap;

use crate::value::ConfigValue;

/// Deep-merge `overlay` on top of `base`.
/// Directories recurse key by key, sequences recurse index by index.
/// Otherwise, `overlay`'s value wins.
pub fn deep_merge(base: ConfigValue, overlay: ConfigValue) -> ConfigValue {
    match (base, overlay) {
        (ConfigValue::Directory(base), ConfigValue::Directory(overlay)) => {
            ConfigValue::Directory(merge_maps(base, overlay))
        }
        (ConfigValue::Sequence(base), ConfigValue::Sequence(overlay)) => {
            ConfigValue::Sequence(merge_sequences(base, overlay))
        }
        (_, overlay) => overlay,
    }
}

fn merge_maps(
    mut base: BTreeMap<String, ConfigValue>,
    overlay: BTreeMap<String, ConfigValue>,
) -> BTreeMap<String, ConfigValue> {
    for (key, overlay_val) in overlay {
        let merged = match base.remove(&key) {
            Some(base_val) => deep_merge(base_val, overlay_val),
            None => overlay_val,
        };
        base.insert(key, merged);
    }
    base
}

fn merge_sequences(base: Vec<ConfigValue>, overlay: Vec<ConfigValue>) -> Vec<ConfigValue> {
    let mut base = base.into_iter();
    let mut merged: Vec<ConfigValue> = overlay
        .into_iter()
        .map(|overlay_val| match base.next() {
            Some(base_val) => deep_merge(base_val, overlay_val),
            None => overlay_val,
        })
        .collect();
    merged.extend(base);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn value(v: Value) -> ConfigValue {
        ConfigValue::from(v)
    }

    #[test]
    fn disjoint_keys_merge() {
        let merged = deep_merge(value(json!({"host": "localhost"})), value(json!({"port": "3000"})));
        assert_eq!(merged.to_json(), json!({"host": "localhost", "port": "3000"}));
    }

    #[test]
    fn same_leaf_key_overlay_wins() {
        let merged = deep_merge(value(json!({"port": "8080"})), value(json!({"port": "3000"})));
        assert_eq!(merged.to_json(), json!({"port": "3000"}));
    }

    #[test]
    fn nested_directories_recurse() {
        let base = value(json!({"database": {"url": "postgres://old", "pool_size": "5"}}));
        let overlay = value(json!({"database": {"pool_size": "20"}}));
        assert_eq!(
            deep_merge(base, overlay).to_json(),
            json!({"database": {"url": "postgres://old", "pool_size": "20"}})
        );
    }

    #[test]
    fn overlay_leaf_replaces_directory() {
        let base = value(json!({"database": {"url": "x"}}));
        let overlay = value(json!({"database": "flat_string"}));
        assert_eq!(deep_merge(base, overlay).to_json(), json!({"database": "flat_string"}));
    }

    #[test]
    fn overlay_directory_replaces_leaf() {
        let base = value(json!({"database": "flat_string"}));
        let overlay = value(json!({"database": {"url": "x"}}));
        assert_eq!(deep_merge(base, overlay).to_json(), json!({"database": {"url": "x"}}));
    }

    #[test]
    fn sequences_merge_by_index() {
        let base = value(json!({"hosts": ["a", "b", "c"]}));
        let overlay = value(json!({"hosts": ["x"]}));
        assert_eq!(deep_merge(base, overlay).to_json(), json!({"hosts": ["x", "b", "c"]}));
    }

    #[test]
    fn longer_overlay_sequence_extends() {
        let base = value(json!(["a"]));
        let overlay = value(json!([{"k": "v"}, "y"]));
        assert_eq!(deep_merge(base, overlay).to_json(), json!([{"k": "v"}, "y"]));
    }

    #[test]
    fn empty_overlay_returns_base() {
        let base = value(json!({"port": "8080"}));
        assert_eq!(deep_merge(base.clone(), ConfigValue::default()), base);
    }

    #[test]
    fn empty_base_returns_overlay() {
        let overlay = value(json!({"port": "3000"}));
        assert_eq!(deep_merge(ConfigValue::default(), overlay.clone()), overlay);
    }

    #[test]
    fn deeply_nested_three_levels() {
        let base = value(json!({"a": {"b": {"c": {"val": "1", "other": "keep"}}}}));
        let overlay = value(json!({"a": {"b": {"c": {"val": "99"}}}}));
        assert_eq!(
            deep_merge(base, overlay).to_json(),
            json!({"a": {"b": {"c": {"val": "99", "other": "keep"}}}})
        );
    }
}
