//! Version 2: Java problem tests moved onto the JUnit-based verifier.
//!
//! Legacy Java tests are bare statements. The new verifier runs a JUnit
//! class, so each problem's tests are wrapped in a fixed class template and
//! the wrapped text is copied to every queued solution of the problem and
//! to every pending Java task. Each rewrite is its own `set`; a failure
//! part way leaves earlier nodes converted, and a re-run skips text that is
//! already wrapped.

use async_trait::async_trait;
use serde_json::Value;
use singpath_store::{Query, RemoteClient};
use tracing::Instrument;

use super::{child_keys, children, levels_path, problems_path, ProblemKey, PATHS, TASK_QUEUE};
use crate::error::MigrationError;
use crate::options::MigrateOptions;
use crate::routine::MigrationRoutine;

const VERSION: u32 = 2;
const LANGUAGE: &str = "java";

const TEST_CLASS_HEAD: &str = "import org.junit.Test;
import static org.junit.Assert.*;
import junit.framework.*;
import com.singpath.SolutionRunner;

public class SingPathTest extends SolutionRunner {

  @Test
  public void testCapitalize() throws Exception {
";
const TEST_CLASS_TAIL: &str = "
  }
}";
const TEST_INDENT: &str = "    ";

/// Wrap bare Java test statements in the verifier's JUnit class.
///
/// Every line, blank ones included, is indented by four spaces. Pure and
/// deterministic.
pub fn wrap_java_tests(tests: &str) -> String {
    let body = tests
        .split('\n')
        .map(|line| format!("{}{}", TEST_INDENT, line))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}{}{}", TEST_CLASS_HEAD, body, TEST_CLASS_TAIL)
}

/// Whether `tests` already went through [`wrap_java_tests`].
pub fn is_wrapped_java_tests(tests: &str) -> bool {
    tests.starts_with(TEST_CLASS_HEAD)
}

/// Rewrites Java problem tests and propagates them to queued solutions
/// and pending tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaProblemsUpgrade;

#[async_trait]
impl MigrationRoutine for JavaProblemsUpgrade {
    fn version(&self) -> u32 {
        VERSION
    }

    fn description(&self) -> &str {
        "Convert Java problems to new verifier"
    }

    async fn upgrade(
        &self,
        client: &dyn RemoteClient,
        options: &MigrateOptions,
    ) -> Result<u32, MigrationError> {
        let span = tracing::info_span!("upgrade", version = VERSION, base_uri = client.base_uri());
        async {
            tracing::debug!("upgrader targeting {}", client.base_uri());
            let mut run = Upgrader {
                client,
                options,
                stats: Stats::default(),
            };
            run.migrate_paths().await?;
            run.migrate_task_tests().await?;
            tracing::info!(
                problems = run.stats.problems,
                solutions = run.stats.solutions,
                tasks = run.stats.tasks,
                skipped = run.stats.skipped,
                "java tests converted"
            );
            Ok(VERSION)
        }
        .instrument(span)
        .await
    }

    // Wrapped tests stay wrapped: the old verifier is gone.
}

#[derive(Debug, Default)]
struct Stats {
    problems: usize,
    solutions: usize,
    tasks: usize,
    skipped: usize,
}

struct Upgrader<'a> {
    client: &'a dyn RemoteClient,
    options: &'a MigrateOptions,
    stats: Stats,
}

impl Upgrader<'_> {
    async fn migrate_paths(&mut self) -> Result<(), MigrationError> {
        tracing::info!("migrating solutions...");

        let ids: Vec<String> = children(self.client, PATHS, None)
            .await?
            .into_iter()
            .filter(|(_, path)| path.get("language").and_then(Value::as_str) == Some(LANGUAGE))
            .map(|(id, _)| id)
            .collect();
        tracing::debug!(?ids, "paths to handle");

        for path_id in ids {
            self.migrate_levels(&path_id).await?;
        }
        Ok(())
    }

    async fn migrate_levels(&mut self, path_id: &str) -> Result<(), MigrationError> {
        let ids = child_keys(self.client, &levels_path(path_id)).await?;
        tracing::debug!(path_id, ?ids, "levels to handle");
        for level_id in ids {
            self.migrate_problem_tests(path_id, &level_id).await?;
        }
        Ok(())
    }

    async fn migrate_problem_tests(
        &mut self,
        path_id: &str,
        level_id: &str,
    ) -> Result<(), MigrationError> {
        let problems = children(self.client, &problems_path(path_id, level_id), None).await?;
        tracing::debug!(path_id, level_id, ids = ?problems.keys().collect::<Vec<_>>(), "problems to handle");

        for (problem_id, problem) in problems {
            let key = ProblemKey::new(path_id, level_id, &problem_id);
            let Some(old_tests) = problem.get("tests").and_then(Value::as_str) else {
                tracing::warn!(problem = %key, "problem has no tests");
                self.stats.skipped += 1;
                continue;
            };

            let tests = if is_wrapped_java_tests(old_tests) {
                tracing::debug!(problem = %key, "problem tests already converted");
                old_tests.to_string()
            } else {
                let tests = wrap_java_tests(old_tests);
                self.set(&format!("{}/tests", key.under("problems")), &tests)
                    .await?;
                self.stats.problems += 1;
                tests
            };

            self.migrate_solutions_tests(&key, &tests).await?;
        }
        Ok(())
    }

    async fn migrate_solutions_tests(
        &mut self,
        key: &ProblemKey,
        tests: &str,
    ) -> Result<(), MigrationError> {
        tracing::info!(problem = %key, "migrating solutions tests");

        let solutions = children(self.client, &key.under("queuedSolutions"), None).await?;
        for (public_id, solution) in solutions {
            match solution
                .pointer("/default/payload/tests")
                .and_then(Value::as_str)
            {
                None => {
                    tracing::debug!(problem = %key, public_id, "solution has no tests");
                }
                Some(current) if current == tests => {
                    tracing::debug!(problem = %key, public_id, "solution tests already converted");
                }
                Some(_) => {
                    let path = format!(
                        "{}/{}/default/payload/tests",
                        key.under("queuedSolutions"),
                        public_id
                    );
                    self.set(&path, tests).await?;
                    self.stats.solutions += 1;
                }
            }
        }
        Ok(())
    }

    async fn migrate_task_tests(&mut self) -> Result<(), MigrationError> {
        tracing::info!("migrating tasks...");

        let pending = Query::order_by("completed", false);
        let tasks = children(self.client, TASK_QUEUE, Some(&pending)).await?;
        tracing::debug!(ids = ?tasks.keys().collect::<Vec<_>>(), "tasks to handle");

        for (task_id, task) in tasks {
            if task.pointer("/payload/language").and_then(Value::as_str) != Some(LANGUAGE) {
                continue;
            }
            let Some(old_tests) = task.pointer("/payload/tests").and_then(Value::as_str) else {
                tracing::warn!(%task_id, "task has no tests");
                self.stats.skipped += 1;
                continue;
            };
            if is_wrapped_java_tests(old_tests) {
                tracing::debug!(%task_id, "task tests already converted");
                continue;
            }

            let tests = wrap_java_tests(old_tests);
            self.set(&format!("{}/{}/payload/tests", TASK_QUEUE, task_id), &tests)
                .await?;
            self.stats.tasks += 1;
        }
        Ok(())
    }

    async fn set(&self, path: &str, tests: &str) -> Result<(), MigrationError> {
        self.client
            .set(path, Value::String(tests.to_string()), self.options.query_log())
            .await?;
        Ok(())
    }
}
