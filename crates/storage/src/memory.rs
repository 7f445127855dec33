//! In-memory `RemoteClient` backend.
//!
//! Holds the whole store as one JSON tree behind a mutex. Besides serving
//! as the test double for migration routines it offers failure injection
//! and a write journal, so callers can assert exactly which writes a
//! routine issued.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::path::{self, segments};
use crate::push_id::PushIdGenerator;
use crate::query::{Query, QueryLog, WriteEvent};
use crate::traits::RemoteClient;

/// One node write observed by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub path: String,
    pub value: Value,
}

/// A `RemoteClient` over a JSON tree held in memory.
///
/// Values are stored the way the remote store keeps them: `null` children
/// and empty objects are pruned on write. [`server_timestamp`] placeholders
/// are stored verbatim.
///
/// [`server_timestamp`]: crate::server_timestamp
#[derive(Debug)]
pub struct MemoryStore {
    base_uri: String,
    ids: PushIdGenerator,
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    root: Value,
    failing: Vec<String>,
    writes: Vec<WriteRecord>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            base_uri: "memory://".to_string(),
            ids: PushIdGenerator::new(),
            inner: Mutex::new(MemoryInner::default()),
        }
    }

    /// A store pre-seeded with `data` as its root node.
    pub fn with_data(data: Value) -> Self {
        let store = Self::new();
        store.lock().root = prune(data).unwrap_or(Value::Null);
        store
    }

    pub fn with_base_uri(mut self, base_uri: &str) -> Self {
        self.base_uri = base_uri.to_string();
        self
    }

    /// Make every call addressing `prefix` or a node below it fail with
    /// `StoreError::Transport`.
    pub fn fail_on(&self, prefix: &str) {
        self.lock().failing.push(path::normalize(prefix));
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// The whole tree; an empty store is `{}`.
    pub fn data(&self) -> Value {
        match &self.lock().root {
            Value::Null => Value::Object(Map::new()),
            root => root.clone(),
        }
    }

    /// Read a node without going through the async client surface.
    pub fn read(&self, path: &str) -> Option<Value> {
        read_node(&self.lock().root, path).cloned()
    }

    /// Every node write applied so far, in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryInner {
    fn check(&self, target: &str) -> Result<(), StoreError> {
        match self.failing.iter().find(|p| path::is_under(target, p)) {
            Some(prefix) => Err(StoreError::transport(
                target,
                format!("injected failure under '{}'", prefix),
            )),
            None => Ok(()),
        }
    }

    fn write(&mut self, target: &str, value: Value) {
        let target = path::normalize(target);
        write_node(&mut self.root, &segments(&target), prune(value.clone()));
        self.writes.push(WriteRecord {
            path: target,
            value,
        });
    }
}

#[async_trait]
impl RemoteClient for MemoryStore {
    fn base_uri(&self) -> &str {
        &self.base_uri
    }

    async fn get(&self, path: &str, query: Option<&Query>) -> Result<Option<Value>, StoreError> {
        path::validate(path)?;
        let inner = self.lock();
        inner.check(path)?;
        let node = read_node(&inner.root, path).cloned();
        Ok(match (node, query) {
            (Some(node), Some(query)) => Some(query.apply(node)),
            (node, _) => node,
        })
    }

    async fn set(
        &self,
        path: &str,
        value: Value,
        on_log: Option<&QueryLog>,
    ) -> Result<(), StoreError> {
        let result = path::validate(path).and_then(|()| {
            let mut inner = self.lock();
            inner.check(path)?;
            inner.write(path, value.clone());
            Ok(())
        });

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
        let targets: Vec<(String, Value)> = patch
            .into_iter()
            .map(|(rel, value)| (path::join(base_path, &rel), value))
            .collect();

        let mut inner = self.lock();
        for (target, _) in &targets {
            path::validate(target)?;
            inner.check(target)?;
        }
        for (target, value) in targets {
            inner.write(&target, value);
        }
        Ok(())
    }

    async fn push(&self, queue_path: &str) -> Result<String, StoreError> {
        path::validate(queue_path)?;
        self.lock().check(queue_path)?;
        Ok(self.ids.next_id())
    }
}

fn read_node<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments(path) {
        node = node.as_object()?.get(segment)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Store `value` at `segs` below `node`; `None` deletes. Parents left
/// empty by a deletion are removed too.
fn write_node(node: &mut Value, segs: &[&str], value: Option<Value>) {
    let Some((head, rest)) = segs.split_first() else {
        *node = value.unwrap_or(Value::Null);
        return;
    };

    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    let mut now_empty = false;
    if let Value::Object(children) = node {
        if rest.is_empty() {
            match value {
                Some(value) => {
                    children.insert(head.to_string(), value);
                }
                None => {
                    children.remove(*head);
                }
            }
        } else {
            let child = children.entry(head.to_string()).or_insert(Value::Null);
            write_node(child, rest, value);
            if child.is_null() {
                children.remove(*head);
            }
        }
        now_empty = children.is_empty();
    }
    if now_empty {
        *node = Value::Null;
    }
}

/// Drop `null` members and empty objects, recursively. `None` when nothing
/// storable is left.
fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(children) => {
            let kept: Map<String, Value> = children
                .into_iter()
                .filter_map(|(key, child)| prune(child).map(|child| (key, child)))
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Object(kept))
            }
        }
        other => Some(other),
    }
}
