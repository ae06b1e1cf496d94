//! Clap adapter for the `renv` binary.
//!
//! Compiled only with the `clap` feature (on by default). The bridge to the
//! core is [`Command::into_action`], which turns parsed arguments into an
//! [`EnvAction`]; everything after that goes through [`Renv::handle`](crate::Renv::handle).
//! [`GlobalArgs`] carries the connection flags, which become the highest
//! settings layer, and the `(application, environment)` selection.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::error::RenvError;
use crate::settings::{self, SettingsLoader};
use crate::types::{EnvAction, EnvironmentId, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "renv", version, about = "Hierarchical application configuration stored in etcd")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Environment to operate on.
    #[arg(short, long, global = true, default_value = settings::DEFAULT_ENVIRONMENT)]
    pub environment: String,

    /// Application name. Defaults to the package name in ./Cargo.toml, else "app".
    #[arg(short, long, global = true)]
    pub application: Option<String>,

    /// Store hosts, comma separated (e.g. "10.0.0.1:4001,10.0.0.2:4001").
    #[arg(long, global = true, value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Use https to reach the store.
    #[arg(long, global = true)]
    pub ssl: bool,

    /// CA certificate to trust (repeatable).
    #[arg(long = "ca-path", global = true)]
    pub ca_paths: Vec<PathBuf>,

    /// Client certificate (PEM).
    #[arg(long, global = true)]
    pub cert_path: Option<PathBuf>,

    /// Client private key (PEM).
    #[arg(long, global = true)]
    pub key_path: Option<PathBuf>,

    /// Log store traffic to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// A settings loader with these flags as its CLI layer. Unset flags leave
    /// files and environment in charge.
    pub fn settings_loader(&self) -> SettingsLoader {
        let hosts = (!self.hosts.is_empty()).then(|| self.hosts.clone());
        let ca_paths = (!self.ca_paths.is_empty()).then(|| paths_to_strings(&self.ca_paths));
        SettingsLoader::new()
            .cli_override("hosts", hosts)
            .cli_override("ssl", self.ssl.then_some(true))
            .cli_override("ca_paths", ca_paths)
            .cli_override("cert_path", self.cert_path.as_deref().map(path_to_string))
            .cli_override("key_path", self.key_path.as_deref().map(path_to_string))
    }

    /// The selected environment; the application falls back to the project in `cwd`.
    pub fn environment_id(&self, cwd: &Path) -> Result<EnvironmentId, RenvError> {
        let application = match &self.application {
            Some(name) => name.clone(),
            None => settings::default_application(cwd),
        };
        EnvironmentId::new(&application, &self.environment)
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn paths_to_strings(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| path_to_string(p)).collect()
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|e: RenvError| e.to_string())
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the environment, or one dotted key of it.
    #[command(name = "config")]
    Show {
        /// Output format: console or json.
        #[arg(short, long, default_value = "console", value_parser = parse_format)]
        format: OutputFormat,
        /// Dotted key to show (e.g. "database.url").
        #[arg(short, long)]
        key: Option<String>,
        /// Write JSON to a file instead of printing.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Set values: `KEY=VALUE ...` or `KEY VALUE ...`. Dotted keys nest.
    #[command(name = "config:set")]
    Set {
        #[arg(required = true, allow_hyphen_values = true)]
        pairs: Vec<String>,
    },
    /// Delete keys, with everything under them.
    #[command(name = "config:unset")]
    Unset {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Import a JSON file into the environment.
    #[command(name = "config:import")]
    Import {
        file: PathBuf,
        /// Dotted key to import under.
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Show every application and environment in the store.
    #[command(name = "config:dump")]
    Dump {
        #[arg(short, long, default_value = "console", value_parser = parse_format)]
        format: OutputFormat,
    },
    /// Delete the whole environment.
    #[command(name = "config:nuke")]
    Nuke {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Show this environment deep-merged with another (the other one wins).
    #[command(name = "config:merge")]
    Merge {
        other: String,
        #[arg(short, long, default_value = "console", value_parser = parse_format)]
        format: OutputFormat,
    },
}

impl Command {
    /// Convert clap-parsed args into a framework-agnostic [`EnvAction`].
    ///
    /// `config:nuke` without `--yes` maps to an unconfirmed nuke; the binary
    /// asks before handling it.
    pub fn into_action(self) -> EnvAction {
        match self {
            Command::Show {
                format,
                key,
                output,
            } => EnvAction::Show {
                key,
                format,
                output,
            },
            Command::Set { pairs } => EnvAction::Set { pairs },
            Command::Unset { keys } => EnvAction::Unset { keys },
            Command::Import { file, key } => EnvAction::Import { file, key },
            Command::Dump { format } => EnvAction::Dump { format },
            Command::Nuke { yes } => EnvAction::Nuke { confirmed: yes },
            Command::Merge { other, format } => EnvAction::Merge { other, format },
        }
    }
}
