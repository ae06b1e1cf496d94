//! Rebuild a [`ConfigValue`] from the nodes of a recursive store read.
//!
//! Building happens in two passes:
//!
//! 1. **Insert.** Every leaf (and every childless directory) is inserted at its
//!    path relative to the queried prefix, creating intermediate directories
//!    like a trie. Paths are independent, so node order does not matter.
//! 2. **Coerce.** Bottom-up, any directory whose keys are exactly `0..n-1`
//!    becomes a sequence in index order. A lone `"0"` key therefore reads
//!    back as a one-element sequence.

use std::collections::BTreeMap;

use crate::path;
use crate::store::Node;
use crate::value::ConfigValue;

/// Collect the nodes that carry data: leaves and childless directories.
/// Directories with children are represented by their descendants.
pub fn collect_records(root: &Node) -> Vec<&Node> {
    let mut records = Vec::new();
    let mut stack: Vec<&Node> = root.nodes.iter().collect();
    while let Some(node) = stack.pop() {
        if node.dir && !node.nodes.is_empty() {
            stack.extend(node.nodes.iter());
        } else {
            records.push(node);
        }
    }
    records
}

/// Insert every record under `prefix` into a fresh directory tree.
///
/// Records outside `prefix` are ignored. A leaf with no value reads as an
/// empty string; a childless directory reads as an empty directory.
pub fn build<'a>(prefix: &str, records: impl IntoIterator<Item = &'a Node>) -> ConfigValue {
    let prefix_segments = path::from_store_key(prefix);
    let mut root = BTreeMap::new();

    for node in records {
        let segments = path::from_store_key(&node.key);
        let Some(relative) = segments.strip_prefix(prefix_segments.as_slice()) else {
            continue;
        };
        if relative.is_empty() {
            continue;
        }
        let value = if node.dir {
            ConfigValue::default()
        } else {
            ConfigValue::Leaf(node.value.clone().unwrap_or_default())
        };
        insert(&mut root, relative, value);
    }

    ConfigValue::Directory(root)
}

fn insert(map: &mut BTreeMap<String, ConfigValue>, segments: &[String], value: ConfigValue) {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };

    if rest.is_empty() {
        let keep_existing = matches!(
            (map.get(head), &value),
            (Some(ConfigValue::Directory(_)), ConfigValue::Directory(new)) if new.is_empty()
        );
        if !keep_existing {
            map.insert(head.clone(), value);
        }
        return;
    }

    let slot = map
        .entry(head.clone())
        .or_insert_with(ConfigValue::default);
    if !matches!(slot, ConfigValue::Directory(_)) {
        *slot = ConfigValue::default();
    }
    if let ConfigValue::Directory(child) = slot {
        insert(child, rest, value);
    }
}

/// Turn index-keyed directories into sequences, deepest first.
///
/// Empty directories stay directories, so `{}` survives a round trip.
pub fn coerce_arrays(value: ConfigValue) -> ConfigValue {
    match value {
        ConfigValue::Directory(map) => {
            let map: BTreeMap<String, ConfigValue> = map
                .into_iter()
                .map(|(k, v)| (k, coerce_arrays(v)))
                .collect();
            match as_index_sequence(&map) {
                Some(order) => {
                    let mut map = map;
                    ConfigValue::Sequence(
                        order
                            .iter()
                            .filter_map(|key| map.remove(key))
                            .collect(),
                    )
                }
                None => ConfigValue::Directory(map),
            }
        }
        ConfigValue::Sequence(items) => {
            ConfigValue::Sequence(items.into_iter().map(coerce_arrays).collect())
        }
        leaf => leaf,
    }
}

/// Keys in index order when they are exactly the canonical integers `0..n-1`.
fn as_index_sequence(map: &BTreeMap<String, ConfigValue>) -> Option<Vec<String>> {
    if map.is_empty() {
        return None;
    }
    let mut slots: Vec<Option<&String>> = vec![None; map.len()];
    for key in map.keys() {
        let index: usize = key.parse().ok()?;
        if index.to_string() != *key || index >= slots.len() {
            return None;
        }
        slots[index] = Some(key);
    }
    slots.into_iter().map(|k| k.cloned()).collect()
}
