//! The caller-facing configuration value.
//!
//! The store only knows string leaves and directories. Arrays exist purely by
//! naming convention (children keyed `0..n-1`), so a value is one of three
//! shapes, discriminated at runtime.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::Value;

use crate::path::DOTTED_SEPARATOR;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Leaf(String),
    Directory(BTreeMap<String, ConfigValue>),
    Sequence(Vec<ConfigValue>),
}

impl Default for ConfigValue {
    fn default() -> Self {
        ConfigValue::Directory(BTreeMap::new())
    }
}

impl ConfigValue {
    pub fn leaf(value: impl Into<String>) -> Self {
        ConfigValue::Leaf(value.into())
    }

    /// Wrap `leaf` in one directory per segment: `["a", "b"]` gives `{a: {b: leaf}}`.
    pub fn nested<S: AsRef<str>>(segments: &[S], leaf: ConfigValue) -> Self {
        segments.iter().rev().fold(leaf, |inner, segment| {
            let mut map = BTreeMap::new();
            map.insert(segment.as_ref().to_string(), inner);
            ConfigValue::Directory(map)
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Leaf(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_directory(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            ConfigValue::Directory(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, ConfigValue::Leaf(_))
    }

    /// True for an empty directory or sequence.
    pub fn is_empty(&self) -> bool {
        match self {
            ConfigValue::Leaf(_) => false,
            ConfigValue::Directory(map) => map.is_empty(),
            ConfigValue::Sequence(items) => items.is_empty(),
        }
    }

    /// Navigate by dotted key. Sequence elements are addressed by index.
    pub fn get_path(&self, dotted: &str) -> Option<&ConfigValue> {
        dotted
            .split(DOTTED_SEPARATOR)
            .try_fold(self, |current, segment| current.child(segment))
    }

    fn child(&self, segment: &str) -> Option<&ConfigValue> {
        match self {
            ConfigValue::Leaf(_) => None,
            ConfigValue::Directory(map) => map.get(segment),
            ConfigValue::Sequence(items) => items.get(segment.parse::<usize>().ok()?),
        }
    }

    /// Compact JSON rendering, used for console display of nested values.
    pub fn to_json(&self) -> Value {
        Value::from(self)
    }
}

impl From<&ConfigValue> for Value {
    fn from(value: &ConfigValue) -> Self {
        match value {
            ConfigValue::Leaf(s) => Value::String(s.clone()),
            ConfigValue::Directory(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
            ConfigValue::Sequence(items) => Value::Array(items.iter().map(Value::from).collect()),
        }
    }
}

/// JSON scalars become leaf strings (the store holds strings only); `null`
/// becomes an empty leaf.
impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ConfigValue::Leaf(String::new()),
            Value::Bool(b) => ConfigValue::Leaf(b.to_string()),
            Value::Number(n) => ConfigValue::Leaf(n.to_string()),
            Value::String(s) => ConfigValue::Leaf(s),
            Value::Array(items) => {
                ConfigValue::Sequence(items.into_iter().map(ConfigValue::from).collect())
            }
            Value::Object(map) => ConfigValue::Directory(
                map.into_iter()
                    .map(|(k, v)| (k, ConfigValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigValue::Leaf(s) => serializer.serialize_str(s),
            ConfigValue::Directory(map) => map.serialize(serializer),
            ConfigValue::Sequence(items) => items.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ConfigValue::from)
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Leaf(s) => write!(f, "{s}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_builds_single_key_chain() {
        let value = ConfigValue::nested(&["FOO", "bar", "monkey"], ConfigValue::leaf("blerg"));
        assert_eq!(value.to_json(), json!({"FOO": {"bar": {"monkey": "blerg"}}}));
    }

    #[test]
    fn nested_with_no_segments_is_the_leaf() {
        let value = ConfigValue::nested::<&str>(&[], ConfigValue::leaf("x"));
        assert_eq!(value, ConfigValue::leaf("x"));
    }

    #[test]
    fn json_scalars_become_strings() {
        let value = ConfigValue::from(json!({"port": 8080, "debug": true, "none": null}));
        let map = value.as_directory().unwrap();
        assert_eq!(map["port"].as_str(), Some("8080"));
        assert_eq!(map["debug"].as_str(), Some("true"));
        assert_eq!(map["none"].as_str(), Some(""));
    }

    #[test]
    fn get_path_walks_directories_and_sequences() {
        let value = ConfigValue::from(json!({"bar": {"test": ["33", "http://example.com"]}}));
        assert_eq!(value.get_path("bar.test.1").and_then(ConfigValue::as_str), Some("http://example.com"));
        assert!(value.get_path("bar.test.9").is_none());
        assert!(value.get_path("bar.test.0.deeper").is_none());
    }

    #[test]
    fn serializes_as_plain_json() {
        let value = ConfigValue::from(json!({"a": ["x", {"b": "y"}]}));
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"a":["x",{"b":"y"}]}"#);
        let back: ConfigValue = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn display_leaves_unquoted() {
        assert_eq!(ConfigValue::leaf("bar").to_string(), "bar");
        let seq = ConfigValue::Sequence(vec![ConfigValue::leaf("a")]);
        assert_eq!(seq.to_string(), r#"["a"]"#);
    }

    #[test]
    fn default_is_empty_directory() {
        assert!(ConfigValue::default().is_empty());
        assert!(ConfigValue::default().is_container());
    }
}
