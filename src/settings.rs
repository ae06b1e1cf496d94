//! Connection settings and the layered loader that produces them.
//!
//! Layers, lowest to highest priority:
//!
//! 1. compiled defaults on [`Settings`]
//! 2. `renv.toml` files along the search paths (platform config dir,
//!    `~/.renv/`, the working directory), later files overriding earlier
//! 3. `RENV_*` environment variables
//! 4. CLI overrides
//!
//! The merge itself happens in [`resolve`], which does no I/O so the whole
//! pipeline is testable with synthetic inputs.

use std::path::{Path, PathBuf};

use confique::Config;
use toml::{Table, Value};
use tracing::debug;

use crate::env::{self, EnvKind};
use crate::error::RenvError;
use crate::file;
use crate::path;
use crate::types::SearchPath;
use crate::validate;

pub const APP_NAME: &str = "renv";
pub const FILE_NAME: &str = "renv.toml";
pub const ENV_PREFIX: &str = "RENV";
pub const DEFAULT_APPLICATION: &str = "app";
pub const DEFAULT_ENVIRONMENT: &str = "development";

const ENV_FIELDS: &[(&str, EnvKind)] = &[
    ("hosts", EnvKind::List),
    ("ssl", EnvKind::Flag),
    ("ca_paths", EnvKind::List),
    ("cert_path", EnvKind::Text),
    ("key_path", EnvKind::Text),
];

/// How to reach the store.
#[derive(Config, Debug, Clone)]
pub struct Settings {
    /// Store hosts (`host:port`), tried in order.
    #[config(default = ["127.0.0.1:4001"])]
    pub hosts: Vec<String>,

    /// Talk https to the store.
    #[config(default = false)]
    pub ssl: bool,

    /// Extra CA certificates (PEM) to trust.
    #[config(default = [])]
    pub ca_paths: Vec<PathBuf>,

    /// Client certificate (PEM). Used together with `key_path`.
    pub cert_path: Option<PathBuf>,

    /// Client private key (PEM). Used together with `cert_path`.
    pub key_path: Option<PathBuf>,
}

impl Settings {
    /// https is used when asked for, or when a client identity is configured.
    pub fn uses_tls(&self) -> bool {
        self.ssl || (self.cert_path.is_some() && self.key_path.is_some())
    }
}

/// All pre-loaded data needed to resolve settings. No I/O happens here.
pub struct SettingsInput {
    /// File contents in precedence order: first = lowest priority, last = highest.
    pub files: Vec<(PathBuf, String)>,
    /// Raw environment variable pairs. Empty when env loading is off.
    pub env_vars: Vec<(String, String)>,
    /// CLI overrides, already keyed by field name.
    pub cli_overrides: Table,
    /// Whether to reject unknown keys in settings files.
    pub strict: bool,
}

/// Merge all layers and let confique fill defaults.
pub fn resolve(input: SettingsInput) -> Result<Settings, RenvError> {
    let mut merged = Table::new();
    for (path, content) in &input.files {
        if input.strict {
            validate::validate_unknown_keys::<Settings>(content, path)?;
        }
        let table: Table = toml::from_str(content).map_err(|e| RenvError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        debug!(path = %path.display(), "settings file loaded");
        merged.extend(table);
    }

    merged.extend(env::env_to_table(ENV_PREFIX, ENV_FIELDS, input.env_vars));
    merged.extend(input.cli_overrides);

    let layer: <Settings as Config>::Layer = Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| RenvError::MalformedInput(format!("invalid settings: {e}")))?;

    Settings::builder()
        .preloaded(layer)
        .load()
        .map_err(RenvError::from)
}

/// Builder over [`resolve`] that reads the files and process environment.
pub struct SettingsLoader {
    search_paths: Vec<SearchPath>,
    strict: bool,
    env: bool,
    cli_overrides: Table,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self {
            search_paths: vec![SearchPath::Platform, SearchPath::Home(".renv"), SearchPath::Cwd],
            strict: true,
            env: true,
            cli_overrides: Table::new(),
        }
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the search paths. Order is priority-ascending.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Ignore `RENV_*` variables.
    pub fn no_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Set a field from the command line. `None` leaves lower layers in charge.
    pub fn cli_override<V: Into<Value>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.cli_overrides.insert(key.to_string(), v.into());
        }
        self
    }

    pub fn load(self) -> Result<Settings, RenvError> {
        let files = file::load_settings_files(&self.search_paths, FILE_NAME, APP_NAME)?;
        let env_vars = if self.env {
            std::env::vars().collect()
        } else {
            Vec::new()
        };
        resolve(SettingsInput {
            files,
            env_vars,
            cli_overrides: self.cli_overrides,
            strict: self.strict,
        })
    }
}

/// The application name for a project directory: the `[package] name` of its
/// `Cargo.toml` when present and usable as a key segment, else `"app"`.
pub fn default_application(dir: &Path) -> String {
    let manifest = dir.join("Cargo.toml");
    let Ok(content) = std::fs::read_to_string(&manifest) else {
        return DEFAULT_APPLICATION.to_string();
    };
    let name = toml::from_str::<Table>(&content)
        .ok()
        .and_then(|t| t.get("package")?.get("name")?.as_str().map(str::to_string));
    match name {
        Some(name) if path::check_segment(&name).is_ok() => name,
        _ => DEFAULT_APPLICATION.to_string(),
    }
}
