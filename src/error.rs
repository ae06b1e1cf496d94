use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenvError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Key already exists: {key}")]
    AlreadyExists { key: String },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("{message} ({cause}) [code {code}]")]
    Store {
        code: u32,
        message: String,
        cause: String,
    },

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("Store unreachable: {0}")]
    Transport(String),

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in settings file")]
    UnknownKeys(Vec<RenvError>),

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] confique::Error),
}

impl RenvError {
    /// True for the "key/subtree absent" outcome, which read paths treat as unset.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RenvError::NotFound { .. })
    }
}
