//! Hierarchical application configuration stored in etcd.
//!
//! Configuration lives in an etcd v2 key space under
//! `/<application>/<environment>/`. Nested objects become directories, leaves
//! become string values, and arrays are stored as directories with index
//! keys. Reading an environment reassembles the tree.
//!
//! ```ignore
//! let store = EtcdStore::from_settings(&SettingsLoader::new().load()?)?;
//! let renv = Renv::new(store, EnvironmentId::new("billing", "production")?);
//!
//! renv.set("database.url", "postgres://db.internal/billing").await?;
//! let env = renv.get_environment(&EnvScope::Environment).await?;
//! ```
//!
//! # Key model
//!
//! Callers address values with dotted keys (`database.pool.max`). The store
//! sees slash paths (`/billing/production/database/pool/max`). A key segment
//! may not be empty and may not contain `/` or `.`.
//!
//! | Value | Stored as |
//! |-------|-----------|
//! | `{"a": {"b": "1"}}` | directory `a`, leaf `a/b = 1` |
//! | `{"xs": ["p", "q"]}` | directory `xs`, leaves `xs/0 = p`, `xs/1 = q` |
//! | `{"empty": {}}` | empty directory `empty` |
//!
//! Everything is a string on the way back: numbers and booleans written from
//! JSON read back as their text. A directory whose children are exactly
//! `0..n` reads back as an array, in index order. That includes objects that
//! happened to use those keys.
//!
//! # Operations
//!
//! [`Renv`] carries the operation set for one environment: `set`,
//! `set_pairs`, `set_object`, `get`, `get_environment`, `del`, `del_many`,
//! `delete_environment`, `list_environments` and `merge`. Multi-key writes
//! and deletes run concurrently and stop at the first failure; nothing is
//! rolled back.
//!
//! [`EnvAction`] is the framework-agnostic form of a CLI command and
//! [`Renv::handle`] runs one, returning an [`EnvResult`] to print.
//!
//! # Store seam
//!
//! All store traffic goes through the [`KeyValueStore`] trait.
//! [`EtcdStore`] speaks the v2 HTTP keys API, rotating across hosts when one
//! cannot be reached. [`MemoryStore`] keeps the same node semantics in
//! process, for tests and embedded use.
//!
//! # Settings
//!
//! Connection settings ([`Settings`]) are layered, lowest priority first:
//!
//! ```text
//! Compiled defaults     hosts = ["127.0.0.1:4001"], ssl = false
//!        ↑ overridden by
//! Settings files        renv.toml in the platform config dir, ~/.renv/, ./
//!        ↑ overridden by
//! Environment vars      RENV_HOSTS, RENV_SSL, RENV_CA_PATHS, ...
//!        ↑ overridden by
//! CLI flags             --hosts, --ssl, --ca-path, ...
//! ```
//!
//! Settings files are strict: an unknown key fails loading with its file and
//! line.
//!
//! # Logging
//!
//! The library emits `tracing` events: `debug` for each store call, `info`
//! for completed writes and deletes, `warn` for unreachable hosts and for
//! cleanup that could not finish. The `renv` binary installs the subscriber.

pub mod error;
pub mod store;
pub mod types;

mod client;
#[cfg(feature = "clap")]
pub mod cli;
mod env;
mod file;
mod flatten;
pub(crate) mod merge;
mod ops;
pub mod path;
pub mod settings;
mod tree;
mod validate;
pub mod value;

#[cfg(test)]
mod fixtures;

#[cfg(feature = "clap")]
pub use cli::{Cli, Command, GlobalArgs};
pub use error::RenvError;
pub use ops::{EnvResult, Renv};
pub use settings::{Settings, SettingsLoader};
pub use store::{EtcdStore, KeyValueStore, MemoryStore, Node};
pub use types::{EnvAction, EnvScope, EnvironmentId, OutputFormat, SearchPath};
pub use value::ConfigValue;
