//! etcd v2 keys API over HTTP.
//!
//! Hosts are tried in order. Only a failure to reach a host moves on to the
//! next one; any response from a host, including a store error body, is final.

use std::path::Path;

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity, Method, Url};
use tracing::{debug, warn};

use super::{ApiError, KeyValueStore, StoreError, StoreResponse};
use crate::error::RenvError;
use crate::settings::Settings;

#[derive(Clone)]
pub struct EtcdStore {
    client: Client,
    endpoints: Vec<Url>,
}

impl EtcdStore {
    /// Build a client from connection settings, loading TLS material from disk.
    pub fn from_settings(settings: &Settings) -> Result<Self, RenvError> {
        let mut builder = Client::builder().use_rustls_tls();

        if let (Some(cert), Some(key)) = (&settings.cert_path, &settings.key_path) {
            let mut pem = read_file(cert)?;
            pem.extend(read_file(key)?);
            let identity = Identity::from_pem(&pem).map_err(|e| {
                RenvError::MalformedInput(format!("invalid client certificate: {e}"))
            })?;
            builder = builder.identity(identity);
        }
        for ca in &settings.ca_paths {
            let cert = Certificate::from_pem(&read_file(ca)?).map_err(|e| {
                RenvError::MalformedInput(format!("invalid CA certificate {}: {e}", ca.display()))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| RenvError::Transport(e.to_string()))?;
        Self::with_client(client, &settings.hosts, settings.uses_tls())
    }

    pub fn with_client(client: Client, hosts: &[String], tls: bool) -> Result<Self, RenvError> {
        if hosts.is_empty() {
            return Err(RenvError::MalformedInput("no store hosts configured".into()));
        }
        let endpoints = hosts
            .iter()
            .map(|host| endpoint_url(host, tls))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { client, endpoints })
    }

    async fn request(
        &self,
        method: Method,
        key: &str,
        query: &[(&str, &str)],
        form: Option<&[(&str, &str)]>,
    ) -> Result<StoreResponse, StoreError> {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            let url = keys_url(endpoint, key)?;
            debug!(%method, %url, "store request");

            let mut request = self.client.request(method.clone(), url).query(query);
            if let Some(form) = form {
                request = request.form(form);
            }

            match request.send().await {
                Ok(response) => {
                    let success = response.status().is_success();
                    let body = response
                        .bytes()
                        .await
                        .map_err(|e| StoreError::Transport(e.to_string()))?;
                    return decode_body(success, &body);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    warn!(endpoint = %endpoint, error = %e, "store host unreachable, trying next");
                    last_error = Some(e.to_string());
                }
                Err(e) => return Err(StoreError::Transport(e.to_string())),
            }
        }

        Err(StoreError::Transport(
            last_error.unwrap_or_else(|| "no store hosts configured".into()),
        ))
    }
}

#[async_trait]
impl KeyValueStore for EtcdStore {
    async fn get(&self, key: &str, recursive: bool) -> Result<StoreResponse, StoreError> {
        let query: &[(&str, &str)] = if recursive { &[("recursive", "true")] } else { &[] };
        self.request(Method::GET, key, query, None).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<StoreResponse, StoreError> {
        self.request(Method::PUT, key, &[], Some(&[("value", value)][..]))
            .await
    }

    async fn mkdir(&self, key: &str) -> Result<StoreResponse, StoreError> {
        self.request(Method::PUT, key, &[], Some(&[("dir", "true")][..]))
            .await
    }

    async fn delete(&self, key: &str, recursive: bool) -> Result<StoreResponse, StoreError> {
        let query: &[(&str, &str)] = if recursive { &[("recursive", "true")] } else { &[] };
        self.request(Method::DELETE, key, query, None).await
    }

    async fn rmdir(&self, key: &str) -> Result<StoreResponse, StoreError> {
        self.request(Method::DELETE, key, &[("dir", "true")], None)
            .await
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, RenvError> {
    std::fs::read(path).map_err(|e| RenvError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `127.0.0.1:4001` becomes `http://127.0.0.1:4001/` (or `https` with TLS).
/// Hosts that already carry a scheme are used as given.
fn endpoint_url(host: &str, tls: bool) -> Result<Url, RenvError> {
    let text = if host.contains("://") {
        host.to_string()
    } else {
        let scheme = if tls { "https" } else { "http" };
        format!("{scheme}://{host}")
    };
    Url::parse(&text).map_err(|e| RenvError::MalformedInput(format!("invalid host '{host}': {e}")))
}

/// `/v2/keys/<segments>`, each segment percent-encoded. Keys ending in `/`
/// (and the root) keep their trailing slash.
fn keys_url(endpoint: &Url, key: &str) -> Result<Url, StoreError> {
    let mut url = endpoint.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("{endpoint} cannot be a base URL")))?;
        segments.pop_if_empty().extend(["v2", "keys"]);
        segments.extend(key.split('/').filter(|s| !s.is_empty()));
        if key.ends_with('/') {
            segments.push("");
        }
    }
    Ok(url)
}

/// Parse a response body: a node envelope on success, an error body otherwise.
fn decode_body(success: bool, body: &[u8]) -> Result<StoreResponse, StoreError> {
    if success {
        return serde_json::from_slice(body)
            .map_err(|e| StoreError::Transport(format!("unexpected store response: {e}")));
    }
    match serde_json::from_slice::<ApiError>(body) {
        Ok(api) => Err(StoreError::Api(api)),
        Err(_) => Err(StoreError::Transport(
            String::from_utf8_lossy(body).trim().to_string(),
        )),
    }
}
