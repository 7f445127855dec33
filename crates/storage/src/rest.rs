//! REST transport for the document store.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. Every node is reachable at
//! `<base_uri>/<path>.json`; the credential travels as the `auth` query
//! parameter.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::path;
use crate::push_id::PushIdGenerator;
use crate::query::{Query, QueryLog, WriteEvent};
use crate::traits::RemoteClient;

/// `RemoteClient` speaking the store's JSON REST dialect.
pub struct RestClient {
    base_uri: String,
    auth: String,
    agent: ureq::Agent,
    ids: PushIdGenerator,
}

#[derive(Clone, Copy)]
enum Method {
    Get,
    Put,
    Patch,
}

impl RestClient {
    /// Create a client for the store rooted at `base_uri`, authenticating
    /// every request with `auth`.
    pub fn new(base_uri: &str, auth: &str) -> Self {
        RestClient {
            base_uri: base_uri.trim_end_matches('/').to_string(),
            auth: auth.to_string(),
            agent: ureq::Agent::new_with_defaults(),
            ids: PushIdGenerator::new(),
        }
    }

    /// Request path for a node: `/<path>.json`.
    pub fn resource(path: &str) -> String {
        format!("/{}.json", path::normalize(path))
    }

    /// Absolute URL for a node, without query parameters.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_uri, Self::resource(path))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        params: Vec<(&'static str, String)>,
        body: Option<Value>,
    ) -> Result<Value, StoreError> {
        path::validate(path)?;

        let agent = self.agent.clone();
        let url = self.url(path);
        let auth = self.auth.clone();
        let target = path.to_string();

        tracing::trace!(url = %url, "store request");

        tokio::task::spawn_blocking(move || {
            let response = match (method, body) {
                (Method::Get, _) => {
                    let mut request = agent.get(&url).query("auth", &auth);
                    for (key, value) in &params {
                        request = request.query(*key, value);
                    }
                    request.call()
                }
                (Method::Put, body) => agent
                    .put(&url)
                    .query("auth", &auth)
                    .send_json(body.unwrap_or(Value::Null)),
                (Method::Patch, body) => agent
                    .patch(&url)
                    .query("auth", &auth)
                    .send_json(body.unwrap_or(Value::Null)),
            }
            .map_err(|e| StoreError::transport(&target, e.to_string()))?;

            response
                .into_body()
                .read_json::<Value>()
                .map_err(|e| StoreError::Decode {
                    path: target,
                    message: e.to_string(),
                })
        })
        .await
        .map_err(|e| StoreError::transport(path, format!("task join error: {}", e)))?
    }
}

#[async_trait]
impl RemoteClient for RestClient {
    fn base_uri(&self) -> &str {
        &self.base_uri
    }

    async fn get(&self, path: &str, query: Option<&Query>) -> Result<Option<Value>, StoreError> {
        let params = query.map(Query::params).unwrap_or_default();
        let value = self.send(Method::Get, path, params, None).await?;
        Ok(match value {
            Value::Null => None,
            value => Some(value),
        })
    }

    async fn set(
        &self,
        path: &str,
        value: Value,
        on_log: Option<&QueryLog>,
    ) -> Result<(), StoreError> {
        let result = self
            .send(Method::Put, path, Vec::new(), Some(value.clone()))
            .await
            .map(|_| ());

        if let Some(log) = on_log {
            log(&WriteEvent {
                path: path::normalize(path),
                data: value,
                success: result.is_ok(),
                base_uri: self.base_uri.clone(),
            });
        }
        result
    }

    async fn update(
        &self,
        base_path: &str,
        patch: BTreeMap<String, Value>,
    ) -> Result<(), StoreError> {
        for rel in patch.keys() {
            path::validate(rel)?;
        }
        let body = Value::Object(
            patch
                .into_iter()
                .map(|(rel, value)| (path::normalize(&rel), value))
                .collect(),
        );
        self.send(Method::Patch, base_path, Vec::new(), Some(body))
            .await
            .map(|_| ())
    }

    async fn push(&self, queue_path: &str) -> Result<String, StoreError> {
        path::validate(queue_path)?;
        Ok(self.ids.next_id())
    }
}
