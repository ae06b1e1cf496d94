//! The external key-value store, seen through its get/set/mkdir/delete contract.
//!
//! Node and response shapes mirror the etcd v2 keys API JSON so the HTTP
//! backend can deserialize responses directly. Error codes are passed through
//! untouched; translating them into domain outcomes is the job of
//! [`crate::client`].

pub mod etcd;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use etcd::EtcdStore;
pub use memory::MemoryStore;

/// Store error codes this crate cares about.
pub mod codes {
    pub const KEY_NOT_FOUND: u32 = 100;
    pub const NOT_A_FILE: u32 = 102;
    pub const NOT_A_DIRECTORY: u32 = 104;
    pub const NODE_EXISTS: u32 = 105;
    pub const ROOT_READ_ONLY: u32 = 107;
    pub const DIRECTORY_NOT_EMPTY: u32 = 108;
}

/// A store entry: a leaf with a value, or a directory with children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dir: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub created_index: u64,
    #[serde(default)]
    pub modified_index: u64,
}

/// Envelope returned by every successful store call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub action: String,
    pub node: Node,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_node: Option<Node>,
}

/// An error body reported by the store itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ApiError {
    #[serde(rename = "errorCode")]
    pub code: u32,
    pub message: String,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub index: u64,
}

impl ApiError {
    pub fn new(code: u32, message: &str, cause: &str) -> Self {
        Self {
            code,
            message: message.into(),
            cause: cause.into(),
            index: 0,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Transport(String),
}

/// The four store primitives, plus `rmdir` for removing an empty directory
/// without risking its (possibly newly created) contents.
///
/// Keys are absolute (`/app/env/KEY`). Each call is a single round-trip.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str, recursive: bool) -> Result<StoreResponse, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<StoreResponse, StoreError>;

    async fn mkdir(&self, key: &str) -> Result<StoreResponse, StoreError>;

    async fn delete(&self, key: &str, recursive: bool) -> Result<StoreResponse, StoreError>;

    async fn rmdir(&self, key: &str) -> Result<StoreResponse, StoreError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str, recursive: bool) -> Result<StoreResponse, StoreError> {
        (**self).get(key, recursive).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<StoreResponse, StoreError> {
        (**self).set(key, value).await
    }

    async fn mkdir(&self, key: &str) -> Result<StoreResponse, StoreError> {
        (**self).mkdir(key).await
    }

    async fn delete(&self, key: &str, recursive: bool) -> Result<StoreResponse, StoreError> {
        (**self).delete(key, recursive).await
    }

    async fn rmdir(&self, key: &str) -> Result<StoreResponse, StoreError> {
        (**self).rmdir(key).await
    }
}
