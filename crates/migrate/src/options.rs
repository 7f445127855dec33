use std::fmt;

use singpath_store::QueryLog;

/// Host-supplied knobs for a migration run.
///
/// Only observability is configurable: diagnostic output goes through
/// `tracing`, and `query_log` receives every single-path write a routine
/// issues. None of it changes what a routine does.
#[derive(Clone, Default)]
pub struct MigrateOptions {
    pub query_log: Option<QueryLog>,
}

impl MigrateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_log(mut self, log: QueryLog) -> Self {
        self.query_log = Some(log);
        self
    }

    pub fn query_log(&self) -> Option<&QueryLog> {
        self.query_log.as_ref()
    }
}

impl fmt::Debug for MigrateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrateOptions")
            .field("query_log", &self.query_log.is_some())
            .finish()
    }
}
