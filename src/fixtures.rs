#[cfg(test)]
pub mod test {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use crate::ops::Renv;
    use crate::store::{KeyValueStore, MemoryStore, StoreError, StoreResponse};
    use crate::types::EnvironmentId;

    /// `Renv` for `app/<environment>` over a fresh in-memory store.
    pub fn memory_renv(environment: &str) -> Renv<MemoryStore> {
        Renv::new(
            MemoryStore::new(),
            EnvironmentId::new("app", environment).unwrap(),
        )
    }

    /// A realistic service document: nested objects, arrays of scalars, arrays
    /// of objects, an array longer than ten elements. Leaves are strings so it
    /// reads back unchanged.
    pub fn service_config() -> Value {
        json!({
            "name": "billing",
            "listen": {"host": "0.0.0.0", "port": "8080"},
            "database": {
                "url": "postgres://billing@db.internal:5432/billing?sslmode=require",
                "pool": {"min": "2", "max": "16"},
                "replicas": ["db-r1.internal", "db-r2.internal"]
            },
            "features": ["invoices", "refunds", "credit-notes"],
            "workers": [
                {"queue": "invoices", "concurrency": "4"},
                {"queue": "emails", "concurrency": "2", "tags": ["smtp", "bulk"]}
            ],
            "shards": ["s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11"],
            "banner": "key=value pairs, slashes/and spaces survive"
        })
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Op {
        Get,
        Set,
        Mkdir,
        Delete,
        Rmdir,
    }

    /// A [`MemoryStore`] that fails chosen calls with a chosen error.
    ///
    /// Keys are matched exactly, ignoring a trailing `/`. Calls without a
    /// matching rule reach the inner store.
    #[derive(Clone, Default)]
    pub struct FailingStore {
        inner: MemoryStore,
        rules: Arc<Mutex<Vec<(Op, String, StoreError)>>>,
    }

    impl FailingStore {
        pub fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                rules: Arc::default(),
            }
        }

        pub fn fail(self, op: Op, key: &str, error: StoreError) -> Self {
            self.rules.lock().unwrap().push((
                op,
                key.trim_end_matches('/').to_string(),
                error,
            ));
            self
        }

        fn check(&self, op: Op, key: &str) -> Result<(), StoreError> {
            let key = key.trim_end_matches('/');
            let rules = self.rules.lock().unwrap();
            match rules.iter().find(|(o, k, _)| *o == op && k == key) {
                Some((_, _, err)) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, key: &str, recursive: bool) -> Result<StoreResponse, StoreError> {
            self.check(Op::Get, key)?;
            self.inner.get(key, recursive).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<StoreResponse, StoreError> {
            self.check(Op::Set, key)?;
            self.inner.set(key, value).await
        }

        async fn mkdir(&self, key: &str) -> Result<StoreResponse, StoreError> {
            self.check(Op::Mkdir, key)?;
            self.inner.mkdir(key).await
        }

        async fn delete(&self, key: &str, recursive: bool) -> Result<StoreResponse, StoreError> {
            self.check(Op::Delete, key)?;
            self.inner.delete(key, recursive).await
        }

        async fn rmdir(&self, key: &str) -> Result<StoreResponse, StoreError> {
            self.check(Op::Rmdir, key)?;
            self.inner.rmdir(key).await
        }
    }

    /// `Renv` for `app/development` over `store`.
    pub fn failing_renv(store: FailingStore) -> Renv<FailingStore> {
        Renv::new(store, EnvironmentId::new("app", "development").unwrap())
    }

    #[tokio::test]
    async fn failing_store_only_fails_matching_calls() {
        let store = FailingStore::new(MemoryStore::new()).fail(
            Op::Set,
            "/app/development/BAR/",
            StoreError::Transport("connection reset".into()),
        );
        assert!(store.set("/app/development/FOO", "1").await.is_ok());
        assert!(matches!(
            store.set("/app/development/BAR", "2").await,
            Err(StoreError::Transport(_))
        ));
        assert!(store.get("/app/development/BAR", false).await.is_err());
        assert!(store.get("/app/development/FOO", false).await.is_ok());
    }

    #[test]
    fn service_config_is_an_object() {
        assert!(service_config().is_object());
    }
}
