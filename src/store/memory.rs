//! In-process store with the same node semantics as the etcd v2 keys API.
//!
//! - `set` creates missing parent directories, fails with 104 when a parent is
//!   a leaf and with 102 when the key itself is a directory.
//! - `mkdir` fails with 102 on an existing directory and replaces a leaf.
//! - `delete` of a directory needs `recursive` (102 otherwise); `rmdir` only
//!   removes empty directories (108 otherwise).
//! - The root is read only (107).
//!
//! Clones share the same data, so several environment handles can operate on
//! one store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ApiError, KeyValueStore, Node, StoreError, StoreResponse, codes};

#[derive(Clone)]
struct Entry {
    /// `None` marks a directory.
    value: Option<String>,
    created_index: u64,
    modified_index: u64,
}

#[derive(Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    index: u64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries (leaves and directories) currently stored.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

const ROOT: &str = "/";

fn normalize(key: &str) -> String {
    let segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn parent_of(key: &str) -> &str {
    match key.rfind('/') {
        Some(0) | None => ROOT,
        Some(i) => &key[..i],
    }
}

/// Ancestors of `key`, shallowest first, excluding the root.
fn ancestors(key: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut current = parent_of(key);
    while current != ROOT {
        out.push(current);
        current = parent_of(current);
    }
    out.reverse();
    out
}

fn is_descendant(candidate: &str, key: &str) -> bool {
    if key == ROOT {
        return candidate != ROOT;
    }
    candidate.len() > key.len()
        && candidate.starts_with(key)
        && candidate.as_bytes()[key.len()] == b'/'
}

impl State {
    fn next_index(&mut self) -> u64 {
        self.index += 1;
        self.index
    }

    fn node(&self, key: &str, entry: &Entry, depth: Depth) -> Node {
        let dir = entry.value.is_none();
        let nodes = if dir && depth != Depth::Bare {
            let child_depth = match depth {
                Depth::Recursive => Depth::Recursive,
                _ => Depth::Bare,
            };
            self.children(key)
                .map(|(child_key, child)| self.node(child_key, child, child_depth))
                .collect()
        } else {
            Vec::new()
        };
        Node {
            key: key.to_string(),
            value: entry.value.clone(),
            dir,
            nodes,
            created_index: entry.created_index,
            modified_index: entry.modified_index,
        }
    }

    fn children<'a>(&'a self, key: &'a str) -> impl Iterator<Item = (&'a String, &'a Entry)> + 'a {
        self.entries
            .iter()
            .filter(move |(candidate, _)| is_descendant(candidate, key) && parent_of(candidate) == key)
    }

    fn root_entry(&self) -> Entry {
        Entry {
            value: None,
            created_index: 0,
            modified_index: self.index,
        }
    }

    fn create_parents(&mut self, key: &str) -> Result<(), ApiError> {
        for ancestor in ancestors(key) {
            match self.entries.get(ancestor) {
                Some(Entry { value: Some(_), .. }) => {
                    return Err(ApiError::new(codes::NOT_A_DIRECTORY, "Not a directory", ancestor));
                }
                Some(_) => {}
                None => {
                    let index = self.next_index();
                    self.entries.insert(
                        ancestor.to_string(),
                        Entry {
                            value: None,
                            created_index: index,
                            modified_index: index,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn remove_subtree(&mut self, key: &str) {
        self.entries.remove(key);
        self.entries.retain(|candidate, _| !is_descendant(candidate, key));
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Depth {
    /// The node alone.
    Bare,
    /// Direct children listed, without their own children.
    Children,
    /// Every descendant, nested.
    Recursive,
}

fn response(action: &str, node: Node, prev_node: Option<Node>) -> StoreResponse {
    StoreResponse {
        action: action.into(),
        node,
        prev_node,
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str, recursive: bool) -> Result<StoreResponse, StoreError> {
        let key = normalize(key);
        let state = self.state.read().await;
        let depth = if recursive { Depth::Recursive } else { Depth::Children };
        let entry = if key == ROOT {
            state.root_entry()
        } else {
            state
                .entries
                .get(&key)
                .cloned()
                .ok_or_else(|| ApiError::new(codes::KEY_NOT_FOUND, "Key not found", &key))?
        };
        Ok(response("get", state.node(&key, &entry, depth), None))
    }

    async fn set(&self, key: &str, value: &str) -> Result<StoreResponse, StoreError> {
        let key = normalize(key);
        if key == ROOT {
            return Err(ApiError::new(codes::ROOT_READ_ONLY, "Root is read only", ROOT).into());
        }
        let mut state = self.state.write().await;
        let prev = state.entries.get(&key).cloned();
        if let Some(Entry { value: None, .. }) = prev {
            return Err(ApiError::new(codes::NOT_A_FILE, "Not a file", &key).into());
        }
        state.create_parents(&key)?;

        let index = state.next_index();
        let entry = Entry {
            value: Some(value.to_string()),
            created_index: index,
            modified_index: index,
        };
        state.entries.insert(key.clone(), entry.clone());
        let prev_node = prev.map(|p| state.node(&key, &p, Depth::Bare));
        Ok(response("set", state.node(&key, &entry, Depth::Bare), prev_node))
    }

    async fn mkdir(&self, key: &str) -> Result<StoreResponse, StoreError> {
        let key = normalize(key);
        if key == ROOT {
            return Err(ApiError::new(codes::NOT_A_FILE, "Not a file", ROOT).into());
        }
        let mut state = self.state.write().await;
        let prev = state.entries.get(&key).cloned();
        if let Some(Entry { value: None, .. }) = prev {
            return Err(ApiError::new(codes::NOT_A_FILE, "Not a file", &key).into());
        }
        state.create_parents(&key)?;

        let index = state.next_index();
        let entry = Entry {
            value: None,
            created_index: index,
            modified_index: index,
        };
        state.entries.insert(key.clone(), entry.clone());
        let prev_node = prev.map(|p| state.node(&key, &p, Depth::Bare));
        Ok(response("set", state.node(&key, &entry, Depth::Bare), prev_node))
    }

    async fn delete(&self, key: &str, recursive: bool) -> Result<StoreResponse, StoreError> {
        let key = normalize(key);
        if key == ROOT {
            return Err(ApiError::new(codes::ROOT_READ_ONLY, "Root is read only", ROOT).into());
        }
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .get(&key)
            .cloned()
            .ok_or_else(|| ApiError::new(codes::KEY_NOT_FOUND, "Key not found", &key))?;
        if entry.value.is_none() && !recursive {
            return Err(ApiError::new(codes::NOT_A_FILE, "Not a file", &key).into());
        }

        let prev_node = state.node(&key, &entry, Depth::Recursive);
        state.remove_subtree(&key);
        let index = state.next_index();
        let node = Node {
            key: key.clone(),
            dir: entry.value.is_none(),
            created_index: entry.created_index,
            modified_index: index,
            ..Node::default()
        };
        Ok(response("delete", node, Some(prev_node)))
    }

    async fn rmdir(&self, key: &str) -> Result<StoreResponse, StoreError> {
        let key = normalize(key);
        if key == ROOT {
            return Err(ApiError::new(codes::ROOT_READ_ONLY, "Root is read only", ROOT).into());
        }
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .get(&key)
            .cloned()
            .ok_or_else(|| ApiError::new(codes::KEY_NOT_FOUND, "Key not found", &key))?;
        if entry.value.is_some() {
            return Err(ApiError::new(codes::NOT_A_DIRECTORY, "Not a directory", &key).into());
        }
        if state.children(&key).next().is_some() {
            return Err(ApiError::new(codes::DIRECTORY_NOT_EMPTY, "Directory not empty", &key).into());
        }

        let prev_node = state.node(&key, &entry, Depth::Bare);
        state.entries.remove(&key);
        let index = state.next_index();
        let node = Node {
            key: key.clone(),
            dir: true,
            created_index: entry.created_index,
            modified_index: index,
            ..Node::default()
        };
        Ok(response("delete", node, Some(prev_node)))
    }
}
