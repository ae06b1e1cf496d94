//! Environment operations and the result type callers display.
//!
//! [`Renv`] is the public operation set over one environment: single and bulk
//! `set`, `set_object`, `get`, `get_environment`, `del`, `delete_environment`
//! and `merge`. Everything is composed from the path codec, the flattener, the
//! tree builder and the scoped [`StoreClient`].
//!
//! Multi-key `set`/`del` fan out concurrently and fail on the first error;
//! writes that already landed are not rolled back. `set_object` writes
//! sequentially, directories before their children.

use std::fmt;
use std::path::{Path, PathBuf};

use futures_util::future::{try_join, try_join_all};
use tracing::{debug, info, warn};

use crate::client::{Scope, StoreClient};
use crate::error::RenvError;
use crate::flatten::{self, WriteInstruction};
use crate::merge::deep_merge;
use crate::path;
use crate::store::{KeyValueStore, Node};
use crate::tree;
use crate::types::{EnvAction, EnvScope, EnvironmentId, OutputFormat};
use crate::value::ConfigValue;

pub struct Renv<S> {
    client: StoreClient<S>,
}

impl<S: KeyValueStore> Renv<S> {
    pub fn new(store: S, id: EnvironmentId) -> Self {
        Self {
            client: StoreClient::new(store, id),
        }
    }

    pub fn id(&self) -> &EnvironmentId {
        self.client.id()
    }

    /// Set one key. A dotted key is written as a nested object, creating the
    /// intermediate directories. Returns the written leaf.
    pub async fn set(&self, key: &str, value: &str) -> Result<Node, RenvError> {
        let segments = path::parse_dotted(key)?;
        let node = if segments.len() > 1 {
            let object = ConfigValue::nested(&segments, ConfigValue::leaf(value));
            self.write_object(&object, &[])
                .await?
                .pop()
                .ok_or_else(|| RenvError::MalformedInput(format!("nothing written for '{key}'")))?
        } else {
            self.client.set(Scope::Environment(key), value).await?
        };
        info!(env = %self.id(), %key, "set");
        Ok(node)
    }

    /// Bulk set from alternating `KEY VALUE` tokens and/or `KEY=VALUE` tokens.
    /// All keys are validated before any write is issued.
    pub async fn set_pairs<T: AsRef<str>>(&self, tokens: &[T]) -> Result<Vec<Node>, RenvError> {
        let pairs = pair_tokens(tokens)?;
        for (key, _) in &pairs {
            path::parse_dotted(key)?;
        }
        try_join_all(pairs.iter().map(|(key, value)| self.set(key, value))).await
    }

    /// Write a whole object into the environment, optionally under a dotted
    /// `prefix`.
    pub async fn set_object(&self, object: &ConfigValue, prefix: Option<&str>) -> Result<(), RenvError> {
        let root = match prefix {
            Some(prefix) => path::parse_dotted(prefix)?,
            None => Vec::new(),
        };
        if root.is_empty() && !object.is_container() {
            return Err(RenvError::MalformedInput(
                "a top-level value must be an object or an array".into(),
            ));
        }
        let written = self.write_object(object, &root).await?;
        info!(env = %self.id(), leaves = written.len(), "object written");
        Ok(())
    }

    async fn write_object(&self, object: &ConfigValue, root: &[String]) -> Result<Vec<Node>, RenvError> {
        let instructions = flatten::flatten(object, root);
        for instruction in &instructions {
            for segment in instruction.path() {
                path::check_segment(segment).map_err(|reason| {
                    RenvError::MalformedInput(format!("invalid object key: {reason}"))
                })?;
            }
        }

        let mut written = Vec::new();
        for instruction in &instructions {
            match instruction {
                WriteInstruction::MakeDirectory(segments) => {
                    let key = path::to_store_key(segments);
                    self.client.mkdir(Scope::Environment(&key)).await?;
                }
                WriteInstruction::SetLeaf(segments, value) => {
                    let key = path::to_store_key(segments);
                    written.push(self.client.set(Scope::Environment(&key), value).await?);
                }
            }
        }
        Ok(written)
    }

    /// Read one key. Absent keys (and directories) read as `None`.
    pub async fn get(&self, key: &str) -> Result<Option<String>, RenvError> {
        let segments = path::parse_dotted(key)?;
        let key = path::to_store_key(&segments);
        match self.client.get(Scope::Environment(&key), false).await {
            Ok(node) => Ok(node.value),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read a subtree back into a nested object. An absent subtree reads as `{}`.
    pub async fn get_environment(&self, scope: &EnvScope) -> Result<ConfigValue, RenvError> {
        let prefix = match scope {
            EnvScope::Environment => self.client.resolve(Scope::Environment("")),
            EnvScope::Key(dotted) => {
                let segments = path::parse_dotted(dotted)?;
                let relative = format!("{}/", path::to_store_key(&segments));
                self.client.resolve(Scope::Environment(&relative))
            }
            EnvScope::Application => self.client.resolve(Scope::Application),
            EnvScope::Root => "/".to_string(),
        };

        let node = match self.client.get(Scope::Absolute(&prefix), true).await {
            Ok(node) => node,
            Err(e) if e.is_not_found() => return Ok(ConfigValue::default()),
            Err(e) => return Err(e),
        };
        if !node.dir || node.nodes.is_empty() {
            return Ok(ConfigValue::default());
        }

        let built = tree::build(&prefix, tree::collect_records(&node));
        Ok(tree::coerce_arrays(built))
    }

    /// Names of the environments stored for this application.
    pub async fn list_environments(&self) -> Result<Vec<String>, RenvError> {
        let node = match self.client.get(Scope::Application, false).await {
            Ok(node) => node,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut names: Vec<String> = node
            .nodes
            .iter()
            .filter(|n| n.dir)
            .filter_map(|n| path::from_store_key(&n.key).pop())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Recursively delete one key. A missing key is an error. Directories left
    /// empty by the delete are removed, up to the environment directory.
    pub async fn del(&self, key: &str) -> Result<Node, RenvError> {
        let segments = path::parse_dotted(key)?;
        let node = self
            .client
            .delete(Scope::Environment(&path::to_store_key(&segments)), true)
            .await?;
        self.prune_empty_ancestors(&segments).await;
        info!(env = %self.id(), %key, "deleted");
        Ok(node)
    }

    async fn prune_empty_ancestors(&self, segments: &[String]) {
        for depth in (1..segments.len()).rev() {
            let key = path::to_store_key(&segments[..depth]);
            match self.client.rmdir(Scope::Environment(&key)).await {
                Ok(_) => debug!(%key, "removed empty directory"),
                Err(e) => {
                    debug!(%key, error = %e, "stopped pruning");
                    break;
                }
            }
        }
    }

    /// Delete several keys concurrently. Any failure fails the whole call.
    pub async fn del_many<T: AsRef<str>>(&self, keys: &[T]) -> Result<(), RenvError> {
        for key in keys {
            path::parse_dotted(key.as_ref())?;
        }
        try_join_all(keys.iter().map(|key| self.del(key.as_ref()))).await?;
        Ok(())
    }

    /// Delete the whole environment, then the application directory if that
    /// left it empty. An already-absent environment is not an error. Failures
    /// while tidying the application directory are logged, not returned.
    pub async fn delete_environment(&self) -> Result<(), RenvError> {
        match self.client.delete(Scope::Environment(""), true).await {
            Ok(_) => info!(env = %self.id(), "environment deleted"),
            Err(e) if e.is_not_found() => debug!(env = %self.id(), "environment already empty"),
            Err(e) => return Err(e),
        }

        if let Err(e) = self.prune_application().await {
            warn!(
                application = self.id().application(),
                error = %e,
                "could not tidy application directory"
            );
        }
        Ok(())
    }

    async fn prune_application(&self) -> Result<(), RenvError> {
        let node = match self.client.get(Scope::Application, false).await {
            Ok(node) => node,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        if node.dir && node.nodes.is_empty() {
            self.client.rmdir(Scope::Application).await?;
            debug!(application = self.id().application(), "removed empty application directory");
        }
        Ok(())
    }

    /// Deep-merge this environment with `other`; `other` wins on conflicting
    /// leaves. Nothing is written back.
    pub async fn merge<T: KeyValueStore>(&self, other: &Renv<T>) -> Result<ConfigValue, RenvError> {
        let (base, overlay) = try_join(
            self.get_environment(&EnvScope::Environment),
            other.get_environment(&EnvScope::Environment),
        )
        .await?;
        Ok(deep_merge(base, overlay))
    }
}

impl<S: KeyValueStore + Clone> Renv<S> {
    /// A handle on another environment of the same application, sharing the store.
    pub fn with_environment(&self, environment: &str) -> Result<Renv<S>, RenvError> {
        Ok(Renv::new(
            self.client.store().clone(),
            self.id().sibling(environment)?,
        ))
    }

    /// Run an [`EnvAction`] and return the result to display.
    pub async fn handle(&self, action: &EnvAction) -> Result<EnvResult, RenvError> {
        match action {
            EnvAction::Show { key, format, output } => {
                let environment = self.get_environment(&EnvScope::Environment).await?;
                let (title, value) = match key {
                    Some(key) => {
                        let value = environment
                            .get_path(key)
                            .cloned()
                            .ok_or_else(|| RenvError::NotFound { key: key.clone() })?;
                        (format!("{}.{key}", self.id().environment()), value)
                    }
                    None => (self.id().environment().to_string(), environment),
                };
                match output {
                    Some(path) => {
                        write_json(path, &value).await?;
                        Ok(EnvResult::Written { path: path.clone() })
                    }
                    None => Ok(EnvResult::Environment {
                        title,
                        value,
                        format: *format,
                    }),
                }
            }
            EnvAction::Set { pairs } => {
                let pairs = pair_tokens(pairs)?;
                let tokens: Vec<&str> = pairs
                    .iter()
                    .flat_map(|(k, v)| [k.as_str(), v.as_str()])
                    .collect();
                self.set_pairs(&tokens).await?;
                Ok(EnvResult::ValuesSet { pairs })
            }
            EnvAction::Unset { keys } => {
                self.del_many(keys).await?;
                Ok(EnvResult::ValuesUnset { keys: keys.clone() })
            }
            EnvAction::Import { file, key } => {
                let value = read_json(file).await?;
                self.set_object(&value, key.as_deref()).await?;
                Ok(EnvResult::Imported { value })
            }
            EnvAction::Nuke { confirmed } => {
                if !confirmed {
                    return Err(RenvError::Aborted(format!(
                        "refusing to delete {} without confirmation",
                        self.id()
                    )));
                }
                self.delete_environment().await?;
                Ok(EnvResult::Destroyed {
                    prefix: format!("/{}", self.id()),
                })
            }
            EnvAction::Dump { format } => Ok(EnvResult::Environment {
                title: "/".into(),
                value: self.get_environment(&EnvScope::Root).await?,
                format: *format,
            }),
            EnvAction::Merge { other, format } => {
                let other_env = self.with_environment(other)?;
                Ok(EnvResult::Environment {
                    title: format!("{} + {other}", self.id().environment()),
                    value: self.merge(&other_env).await?,
                    format: *format,
                })
            }
        }
    }
}

/// Split `KEY=VALUE` tokens at the first `=`; other tokens pass through.
pub fn expand_equals<T: AsRef<str>>(tokens: &[T]) -> Vec<String> {
    tokens
        .iter()
        .flat_map(|token| match token.as_ref().split_once('=') {
            Some((key, value)) => vec![key.to_string(), value.to_string()],
            None => vec![token.as_ref().to_string()],
        })
        .collect()
}

/// Expand and pair tokens. An odd count after expansion is malformed.
pub fn pair_tokens<T: AsRef<str>>(tokens: &[T]) -> Result<Vec<(String, String)>, RenvError> {
    let expanded = expand_equals(tokens);
    if expanded.len() % 2 != 0 {
        return Err(RenvError::MalformedInput(format!(
            "expected key/value pairs, got {} tokens: {}",
            expanded.len(),
            expanded.join(" ")
        )));
    }
    Ok(expanded
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

async fn read_json(path: &Path) -> Result<ConfigValue, RenvError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RenvError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
    serde_json::from_str(&content).map_err(|e| RenvError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

async fn write_json(path: &Path, value: &ConfigValue) -> Result<(), RenvError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| RenvError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| RenvError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Result of an environment operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvResult {
    /// A configuration tree to print.
    Environment {
        title: String,
        value: ConfigValue,
        format: OutputFormat,
    },
    /// Confirmation that a tree was written to a file.
    Written { path: PathBuf },
    /// Confirmation of a bulk set.
    ValuesSet { pairs: Vec<(String, String)> },
    /// Confirmation of deleted keys.
    ValuesUnset { keys: Vec<String> },
    /// The object that was imported.
    Imported { value: ConfigValue },
    /// Confirmation that an environment was deleted.
    Destroyed { prefix: String },
}

impl fmt::Display for EnvResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvResult::Environment {
                value,
                format: OutputFormat::Json,
                ..
            } => {
                let json = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
                write!(f, "{json}")
            }
            EnvResult::Environment {
                title,
                value,
                format: OutputFormat::Console,
            } => {
                write!(f, "==> {title}")?;
                let rows = console_rows(value);
                let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
                for (key, value) in rows {
                    write!(f, "\n{key:<width$}  {value}")?;
                }
                Ok(())
            }
            EnvResult::Written { path } => {
                write!(f, "Configuration written to {}", path.display())
            }
            EnvResult::ValuesSet { pairs } => {
                let shown: Vec<String> = pairs.iter().map(|(k, v)| format!("{k} = {v}")).collect();
                write!(f, "set: {}", shown.join(", "))
            }
            EnvResult::ValuesUnset { keys } => write!(f, "unset: {}", keys.join(", ")),
            EnvResult::Imported { value } => write!(f, "imported: {value}"),
            EnvResult::Destroyed { prefix } => write!(f, "destroyed: {prefix}"),
        }
    }
}

/// One row per top-level entry; nested values render as compact JSON.
fn console_rows(value: &ConfigValue) -> Vec<(String, String)> {
    match value {
        ConfigValue::Leaf(s) => vec![(String::new(), s.clone())],
        ConfigValue::Directory(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect(),
        ConfigValue::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.to_string()))
            .collect(),
    }
}
