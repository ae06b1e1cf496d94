use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::RenvError;
use crate::path;

/// An `(application, environment)` pair. Owns the store prefix
/// `/application/environment/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentId {
    application: String,
    environment: String,
}

impl EnvironmentId {
    pub fn new(application: &str, environment: &str) -> Result<Self, RenvError> {
        for (what, name) in [("application", application), ("environment", environment)] {
            path::check_segment(name)
                .map_err(|reason| RenvError::MalformedInput(format!("invalid {what} name: {reason}")))?;
        }
        Ok(Self {
            application: application.to_string(),
            environment: environment.to_string(),
        })
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// `/application/environment/`
    pub fn prefix(&self) -> String {
        format!("/{}/{}/", self.application, self.environment)
    }

    /// `/application/`
    pub fn application_prefix(&self) -> String {
        format!("/{}/", self.application)
    }

    /// The same application, another environment.
    pub fn sibling(&self, environment: &str) -> Result<Self, RenvError> {
        Self::new(&self.application, environment)
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.application, self.environment)
    }
}

/// What subtree `get_environment` reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnvScope {
    /// The whole environment.
    #[default]
    Environment,
    /// A dotted key inside the environment.
    Key(String),
    /// Every environment of this application, keyed by environment name.
    Application,
    /// The store root: every application and environment.
    Root,
}

/// How environment listings are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned `key  value` rows under a `==>` header.
    #[default]
    Console,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for OutputFormat {
    type Err = RenvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console" => Ok(OutputFormat::Console),
            "json" => Ok(OutputFormat::Json),
            other => Err(RenvError::MalformedInput(format!(
                "unknown format '{other}' (expected console or json)"
            ))),
        }
    }
}

/// Where to search for settings files.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".renv")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit absolute path.
    Path(PathBuf),
}

/// An environment operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvAction {
    /// Print the environment, or one dotted key of it.
    Show {
        key: Option<String>,
        format: OutputFormat,
        output: Option<PathBuf>,
    },
    /// Bulk set from `KEY=VALUE` / `KEY VALUE` tokens.
    Set { pairs: Vec<String> },
    /// Delete keys.
    Unset { keys: Vec<String> },
    /// Write a JSON file into the environment, optionally under a dotted key.
    Import { file: PathBuf, key: Option<String> },
    /// Delete the whole environment. Refused unless `confirmed`.
    Nuke { confirmed: bool },
    /// Print every application and environment.
    Dump { format: OutputFormat },
    /// Print this environment deep-merged with another one.
    Merge { other: String, format: OutputFormat },
}
