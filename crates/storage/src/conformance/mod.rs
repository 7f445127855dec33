//! Conformance test suite for `RemoteClient` implementations.
//!
//! A backend-agnostic suite that any `RemoteClient` can run to verify it
//! honours the contract the migration routines rely on:
//!
//! - **Reads**: absent nodes, shallow listings, ordered filters
//! - **Writes**: set/get round trip, deletion by `null`, multi-path update
//! - **Queue ids**: uniqueness and ordering of `push` ids
//! - **Audit**: the write log callback fires with the outcome
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty client for each test:
//!
//! ```ignore
//! use singpath_store::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async { MemoryStore::new() }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod read;
mod write;

use std::fmt;
use std::future::Future;

use crate::RemoteClient;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "read", "write").
    pub category: String,
    /// Test name (e.g. "absent_node_is_none").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a client.
///
/// The `factory` function is called once per test to create a fresh, empty
/// client, ensuring test isolation.
pub async fn run_conformance_suite<C, F, Fut>(factory: F) -> ConformanceReport
where
    C: RemoteClient,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    let mut results = Vec::new();

    results.extend(read::run_read_tests(&factory).await);
    results.extend(write::run_write_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

/// Seed a fresh client with `value` at `path`, mapping errors to messages.
async fn seed<C: RemoteClient>(client: &C, path: &str, value: serde_json::Value) -> Result<(), String> {
    client
        .set(path, value, None)
        .await
        .map_err(|e| format!("seeding '{}' failed: {}", path, e))
}
