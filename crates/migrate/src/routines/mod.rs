//! The migration routines shipped with this crate, and the store layout
//! they share.
//!
//! Content lives under the `singpath` namespace:
//!
//! ```text
//! singpath/paths/<path>                                  path metadata (language, ...)
//! singpath/levels/<path>/<level>                         level metadata
//! singpath/problems/<path>/<level>/<problem>             problem (tests, ...)
//! singpath/solutions/<path>/<level>/<problem>/<user>     legacy submission
//! singpath/resolutions/<path>/<level>/<problem>/<user>   legacy grading outcome
//! singpath/queuedSolutions/<path>/<level>/<problem>/<user>/default
//! singpath/userProfiles/<user>/queuedSolutions/<path>/<level>/<problem>/default
//! singpath/queues/default/tasks/<task>
//! auth/publicIds/<user>                                  public id -> internal uid
//! ```

mod java_problems;
mod solutions;

use std::fmt;

use serde_json::{Map, Value};
use singpath_store::{Query, RemoteClient, StoreError};

pub use java_problems::{is_wrapped_java_tests, wrap_java_tests, JavaProblemsUpgrade};
pub use solutions::SolutionsUpgrade;

pub const NAMESPACE: &str = "singpath";
pub const PATHS: &str = "singpath/paths";
pub const TASK_QUEUE: &str = "singpath/queues/default/tasks";

/// Address of one problem in the content hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemKey {
    pub path_id: String,
    pub level_id: String,
    pub problem_id: String,
}

impl ProblemKey {
    pub fn new(path_id: &str, level_id: &str, problem_id: &str) -> Self {
        ProblemKey {
            path_id: path_id.to_string(),
            level_id: level_id.to_string(),
            problem_id: problem_id.to_string(),
        }
    }

    /// `<collection>/<path>/<level>/<problem>` under the namespace.
    pub fn under(&self, collection: &str) -> String {
        format!("{}/{}/{}", NAMESPACE, collection, self)
    }

    /// Queued solution of `public_id`, relative to the namespace.
    pub fn queued_solution(&self, public_id: &str) -> String {
        format!("queuedSolutions/{}/{}/default", self, public_id)
    }

    /// Profile summary of `public_id`, relative to the namespace.
    pub fn profile_ref(&self, public_id: &str) -> String {
        format!("userProfiles/{}/queuedSolutions/{}/default", public_id, self)
    }
}

impl fmt::Display for ProblemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.path_id, self.level_id, self.problem_id)
    }
}

pub(crate) fn levels_path(path_id: &str) -> String {
    format!("{}/levels/{}", NAMESPACE, path_id)
}

pub(crate) fn problems_path(path_id: &str, level_id: &str) -> String {
    format!("{}/problems/{}/{}", NAMESPACE, path_id, level_id)
}

/// Keys of the children of `path`, fetched without their values.
pub(crate) async fn child_keys(
    client: &dyn RemoteClient,
    path: &str,
) -> Result<Vec<String>, StoreError> {
    Ok(children(client, path, Some(&Query::Shallow))
        .await?
        .into_iter()
        .map(|(key, _)| key)
        .collect())
}

/// Children of `path` with their full values; empty when absent.
pub(crate) async fn children(
    client: &dyn RemoteClient,
    path: &str,
    query: Option<&Query>,
) -> Result<Map<String, Value>, StoreError> {
    Ok(match client.get(path, query).await? {
        Some(Value::Object(children)) => children,
        _ => Map::new(),
    })
}
