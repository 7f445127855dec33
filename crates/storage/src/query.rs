use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

/// Read modifiers understood by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Keys-only retrieval: every child value is replaced by `true`.
    Shallow,
    /// Keep only the children whose `child` field equals `equal_to`.
    OrderBy { child: String, equal_to: Value },
}

impl Query {
    /// Select children by the value of one of their fields.
    pub fn order_by(child: &str, equal_to: impl Into<Value>) -> Self {
        Query::OrderBy {
            child: child.to_string(),
            equal_to: equal_to.into(),
        }
    }

    /// Query-string parameters for the REST dialect.
    ///
    /// `orderBy` and `equalTo` values are JSON encoded, so a child name is
    /// sent quoted (`orderBy="completed"`).
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Query::Shallow => vec![("shallow", "true".to_string())],
            Query::OrderBy { child, equal_to } => vec![
                ("orderBy", Value::String(child.clone()).to_string()),
                ("equalTo", equal_to.to_string()),
            ],
        }
    }

    /// Apply the query to a node the way the store would server-side.
    pub fn apply(&self, node: Value) -> Value {
        match (self, node) {
            (Query::Shallow, Value::Object(children)) => Value::Object(
                children
                    .into_iter()
                    .map(|(key, _)| (key, Value::Bool(true)))
                    .collect(),
            ),
            (Query::OrderBy { child, equal_to }, Value::Object(children)) => Value::Object(
                children
                    .into_iter()
                    .filter(|(_, value)| value.get(child) == Some(equal_to))
                    .collect::<Map<String, Value>>(),
            ),
            (Query::OrderBy { .. }, _) => Value::Object(Map::new()),
            (Query::Shallow, leaf) => leaf,
        }
    }
}

/// Audit record passed to a [`QueryLog`] after every `set`.
///
/// `path` is the normalized store path (`a/b`, no leading slash or
/// `.json` suffix), whichever backend issued the write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteEvent {
    pub path: String,
    pub data: Value,
    pub success: bool,
    pub base_uri: String,
}

impl fmt::Display for WriteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} = {}",
            if self.success { "OK" } else { "FAILED" },
            self.base_uri,
            self.path,
            self.data
        )
    }
}

/// Callback invoked with every write outcome.
pub type QueryLog = Arc<dyn Fn(&WriteEvent) + Send + Sync>;

/// Placeholder the store replaces with its own clock when written.
pub fn server_timestamp() -> Value {
    serde_json::json!({ ".sv": "timestamp" })
}
