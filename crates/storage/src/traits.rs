use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::query::{Query, QueryLog};

/// The client trait for the hierarchical document store.
///
/// Nodes are addressed by slash-separated paths relative to the store
/// root and hold arbitrary JSON. A node that does not exist reads as
/// `None`; writing `null` deletes a node.
///
/// ## Atomicity
///
/// Only [`update`](RemoteClient::update) writes several nodes at once.
/// There is no transaction spanning separate calls: a caller issuing
/// several `set`s must assume any prefix of them may have landed when one
/// fails.
///
/// ## Credentials
///
/// The credential is bound when the client is constructed and sent with
/// every call; callers never see it again.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Root URI of the store, reported in write audit events.
    fn base_uri(&self) -> &str;

    /// Read the node at `path`, optionally shaped by a [`Query`].
    async fn get(&self, path: &str, query: Option<&Query>) -> Result<Option<Value>, StoreError>;

    /// Replace the node at `path` with `value`.
    ///
    /// When `on_log` is given it is called once the write settles, with
    /// `success` reflecting the outcome.
    async fn set(
        &self,
        path: &str,
        value: Value,
        on_log: Option<&QueryLog>,
    ) -> Result<(), StoreError>;

    /// Write several nodes below `base_path` in one request.
    ///
    /// Keys of `patch` are paths relative to `base_path`; `null` values
    /// delete. Either every entry is applied or none is.
    async fn update(
        &self,
        base_path: &str,
        patch: BTreeMap<String, Value>,
    ) -> Result<(), StoreError>;

    /// Allocate a fresh, unique child key under `queue_path`.
    ///
    /// Nothing is written; the caller stores the new child itself.
    async fn push(&self, queue_path: &str) -> Result<String, StoreError>;
}
