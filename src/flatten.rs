//! Flatten a [`ConfigValue`] into the ordered write instructions that store it.
//!
//! Pre-order, depth-first: a container emits `MakeDirectory` for its own path
//! before any of its children. Sequences are walked as mappings from index to
//! element, so `["a", "b"]` under `list` becomes `list/0 = a`, `list/1 = b`.
//! [`crate::tree`] reverses that encoding on the way back.
//!
//! Directory children come out in sorted key order, not the order they had in
//! the source document: [`ConfigValue::Directory`] is a `BTreeMap`. Sequence
//! elements keep their index order.

use crate::value::ConfigValue;

/// One store write, addressed by segment path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteInstruction {
    MakeDirectory(Vec<String>),
    SetLeaf(Vec<String>, String),
}

impl WriteInstruction {
    pub fn path(&self) -> &[String] {
        match self {
            WriteInstruction::MakeDirectory(path) | WriteInstruction::SetLeaf(path, _) => path,
        }
    }
}

/// Flatten `value` rooted at `root`.
///
/// With an empty `root`, the top-level container itself is not emitted (it is
/// the environment directory). With a non-empty `root`, a container emits a
/// `MakeDirectory` for `root` and a leaf emits a single `SetLeaf`. A bare leaf
/// at an empty root has nowhere to go and yields nothing.
///
/// Directory children come out in key order, sequence children in index order.
pub fn flatten(value: &ConfigValue, root: &[String]) -> Vec<WriteInstruction> {
    let mut out = Vec::new();
    let mut path = root.to_vec();
    if root.is_empty() {
        if value.is_container() {
            walk_children(value, &mut path, &mut out);
        }
    } else {
        walk(value, &mut path, &mut out);
    }
    out
}

fn walk(value: &ConfigValue, path: &mut Vec<String>, out: &mut Vec<WriteInstruction>) {
    match value {
        ConfigValue::Leaf(s) => out.push(WriteInstruction::SetLeaf(path.clone(), s.clone())),
        container => {
            out.push(WriteInstruction::MakeDirectory(path.clone()));
            walk_children(container, path, out);
        }
    }
}

fn walk_children(value: &ConfigValue, path: &mut Vec<String>, out: &mut Vec<WriteInstruction>) {
    match value {
        ConfigValue::Leaf(_) => {}
        ConfigValue::Directory(map) => {
            for (key, child) in map {
                path.push(key.clone());
                walk(child, path, out);
                path.pop();
            }
        }
        ConfigValue::Sequence(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(index.to_string());
                walk(child, path, out);
                path.pop();
            }
        }
    }
}
