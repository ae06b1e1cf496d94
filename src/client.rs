//! Store access scoped to one environment.
//!
//! Every call names a [`Scope`]: a key inside the environment (the common
//! case), the owning application directory, or an absolute key. Store error
//! codes are translated here:
//!
//! | Store outcome | Result |
//! |---|---|
//! | 100 Key not found | [`RenvError::NotFound`] |
//! | 105 Node exists | [`RenvError::AlreadyExists`] |
//! | 102/105 on `mkdir` | `AlreadyExists`, swallowed as `Ok(None)` |
//! | any other error body | [`RenvError::Store`] |
//! | unreachable host | [`RenvError::Transport`] |
//!
//! There is no caching and no retry.

use tracing::debug;

use crate::error::RenvError;
use crate::store::{KeyValueStore, Node, StoreError, codes};
use crate::types::EnvironmentId;

/// Which part of the namespace a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// A relative store key (`FOO/bar`) under `/application/environment/`.
    /// The empty string addresses the environment directory itself.
    Environment(&'a str),
    /// The `/application/` directory.
    Application,
    /// An absolute store key, used as given.
    Absolute(&'a str),
}

pub struct StoreClient<S> {
    store: S,
    id: EnvironmentId,
}

impl<S: KeyValueStore> StoreClient<S> {
    pub fn new(store: S, id: EnvironmentId) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> &EnvironmentId {
        &self.id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The absolute store key a scope resolves to.
    pub fn resolve(&self, scope: Scope<'_>) -> String {
        match scope {
            Scope::Environment(relative) => format!("{}{relative}", self.id.prefix()),
            Scope::Application => self.id.application_prefix(),
            Scope::Absolute(key) => key.to_string(),
        }
    }

    pub async fn get(&self, scope: Scope<'_>, recursive: bool) -> Result<Node, RenvError> {
        let key = self.resolve(scope);
        debug!(%key, recursive, "get");
        self.store
            .get(&key, recursive)
            .await
            .map(|r| r.node)
            .map_err(|e| translate(&key, e))
    }

    pub async fn set(&self, scope: Scope<'_>, value: &str) -> Result<Node, RenvError> {
        let key = self.resolve(scope);
        debug!(%key, "set");
        self.store
            .set(&key, value)
            .await
            .map(|r| r.node)
            .map_err(|e| translate(&key, e))
    }

    /// Create a directory. `Ok(None)` means it already existed.
    pub async fn mkdir(&self, scope: Scope<'_>) -> Result<Option<Node>, RenvError> {
        let key = self.resolve(scope);
        debug!(%key, "mkdir");
        match self.store.mkdir(&key).await {
            Ok(r) => Ok(Some(r.node)),
            Err(e) => match translate_mkdir(&key, e) {
                RenvError::AlreadyExists { key } => {
                    debug!(%key, "directory already exists");
                    Ok(None)
                }
                other => Err(other),
            },
        }
    }

    pub async fn delete(&self, scope: Scope<'_>, recursive: bool) -> Result<Node, RenvError> {
        let key = self.resolve(scope);
        debug!(%key, recursive, "delete");
        self.store
            .delete(&key, recursive)
            .await
            .map(|r| r.node)
            .map_err(|e| translate(&key, e))
    }

    /// Remove a directory only if it is empty.
    pub async fn rmdir(&self, scope: Scope<'_>) -> Result<Node, RenvError> {
        let key = self.resolve(scope);
        debug!(%key, "rmdir");
        self.store
            .rmdir(&key)
            .await
            .map(|r| r.node)
            .map_err(|e| translate(&key, e))
    }
}

fn translate(key: &str, err: StoreError) -> RenvError {
    match err {
        StoreError::Api(api) if api.code == codes::KEY_NOT_FOUND => {
            RenvError::NotFound { key: key.into() }
        }
        StoreError::Api(api) if api.code == codes::NODE_EXISTS => {
            RenvError::AlreadyExists { key: key.into() }
        }
        StoreError::Api(api) => RenvError::Store {
            code: api.code,
            message: api.message,
            cause: api.cause,
        },
        StoreError::Transport(msg) => RenvError::Transport(msg),
    }
}

/// `mkdir` on an existing directory reports 102 (Not a file); that also
/// means the directory is already there.
fn translate_mkdir(key: &str, err: StoreError) -> RenvError {
    match err {
        StoreError::Api(api) if api.code == codes::NOT_A_FILE => {
            RenvError::AlreadyExists { key: key.into() }
        }
        other => translate(key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ApiError, MemoryStore};

    fn client() -> StoreClient<MemoryStore> {
        StoreClient::new(
            MemoryStore::new(),
            EnvironmentId::new("app", "development").unwrap(),
        )
    }

    #[test]
    fn scopes_resolve_to_absolute_keys() {
        let c = client();
        assert_eq!(c.resolve(Scope::Environment("FOO")), "/app/development/FOO");
        assert_eq!(c.resolve(Scope::Environment("")), "/app/development/");
        assert_eq!(c.resolve(Scope::Application), "/app/");
        assert_eq!(c.resolve(Scope::Absolute("/")), "/");
    }

    #[tokio::test]
    async fn set_is_prefixed() {
        let c = client();
        let node = c.set(Scope::Environment("FOO"), "bar").await.unwrap();
        assert_eq!(node.key, "/app/development/FOO");
        assert_eq!(node.value.as_deref(), Some("bar"));
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let c = client();
        let err = c.get(Scope::Environment("MISSING"), false).await.unwrap_err();
        match err {
            RenvError::NotFound { key } => assert_eq!(key, "/app/development/MISSING"),
            other => panic!("Expected NotFound, got {other:?}"),
        }
        assert!(c.delete(Scope::Environment("MISSING"), true).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn mkdir_is_idempotent() {
        let c = client();
        assert!(c.mkdir(Scope::Environment("dir")).await.unwrap().is_some());
        assert!(c.mkdir(Scope::Environment("dir")).await.unwrap().is_none());
    }

    #[test]
    fn existing_directory_codes_translate_to_already_exists() {
        let not_a_file = || StoreError::Api(ApiError::new(codes::NOT_A_FILE, "Not a file", "/app/x"));
        let exists = || StoreError::Api(ApiError::new(codes::NODE_EXISTS, "Node exists", "/app/x"));

        assert!(matches!(translate_mkdir("/app/x", not_a_file()), RenvError::AlreadyExists { .. }));
        assert!(matches!(translate_mkdir("/app/x", exists()), RenvError::AlreadyExists { .. }));
        assert!(matches!(translate("/app/x", exists()), RenvError::AlreadyExists { .. }));
        match translate("/app/x", not_a_file()) {
            RenvError::Store { code, .. } => assert_eq!(code, codes::NOT_A_FILE),
            other => panic!("Expected Store error, got {other:?}"),
        }
    }

    #[test]
    fn transport_errors_pass_through() {
        let err = translate("/app/x", StoreError::Transport("connection refused".into()));
        match err {
            RenvError::Transport(msg) => assert_eq!(msg, "connection refused"),
            other => panic!("Expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_store_errors_keep_their_code() {
        let c = client();
        c.set(Scope::Environment("leaf"), "x").await.unwrap();
        match c.set(Scope::Environment("leaf/child"), "y").await.unwrap_err() {
            RenvError::Store { code, .. } => assert_eq!(code, codes::NOT_A_DIRECTORY),
            other => panic!("Expected Store error, got {other:?}"),
        }
    }
}
