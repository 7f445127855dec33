//! Version 1: legacy solutions and resolutions to queued solutions.
//!
//! Every legacy `(solution, resolution)` pair becomes a queued solution
//! plus a summary under the user's profile, written in one multi-path
//! update. Pairs that were never graded also get a work-queue task in the
//! same update, so a verifier picks them up.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use singpath_store::{server_timestamp, RemoteClient};
use tracing::Instrument;

use super::{
    child_keys, children, levels_path, problems_path, ProblemKey, NAMESPACE, PATHS, TASK_QUEUE,
};
use crate::error::MigrationError;
use crate::model::{LegacyResolution, QueuedSolution, SolutionPayload, SolutionRef, Task};
use crate::options::MigrateOptions;
use crate::routine::MigrationRoutine;

const VERSION: u32 = 1;

/// Restructures legacy solutions into queued solutions, creating a task
/// for each submission that still needs grading.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolutionsUpgrade;

#[async_trait]
impl MigrationRoutine for SolutionsUpgrade {
    fn version(&self) -> u32 {
        VERSION
    }

    fn description(&self) -> &str {
        "Convert solutions and resolutions to queuedSolutions"
    }

    async fn upgrade(
        &self,
        client: &dyn RemoteClient,
        _options: &MigrateOptions,
    ) -> Result<u32, MigrationError> {
        let span = tracing::info_span!("upgrade", version = VERSION, base_uri = client.base_uri());
        async {
            let mut run = Upgrader {
                client,
                stats: Stats::default(),
            };
            run.migrate_paths().await?;
            tracing::info!(
                migrated = run.stats.migrated,
                tasks_created = run.stats.tasks_created,
                skipped = run.stats.skipped,
                "solutions migrated"
            );
            Ok(VERSION)
        }
        .instrument(span)
        .await
    }

    // Nothing to undo: legacy solutions are left in place by the upgrade.
}

#[derive(Debug, Default)]
struct Stats {
    migrated: usize,
    tasks_created: usize,
    skipped: usize,
}

struct Upgrader<'a> {
    client: &'a dyn RemoteClient,
    stats: Stats,
}

impl Upgrader<'_> {
    async fn migrate_paths(&mut self) -> Result<(), MigrationError> {
        let ids = child_keys(self.client, PATHS).await?;
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
            self.migrate_problems(path_id, &level_id).await?;
        }
        Ok(())
    }

    async fn migrate_problems(
        &mut self,
        path_id: &str,
        level_id: &str,
    ) -> Result<(), MigrationError> {
        let ids = child_keys(self.client, &problems_path(path_id, level_id)).await?;
        tracing::debug!(path_id, level_id, ?ids, "problems to handle");
        for problem_id in ids {
            let key = ProblemKey::new(path_id, level_id, &problem_id);
            self.migrate_solutions(&key).await?;
        }
        Ok(())
    }

    async fn migrate_solutions(&mut self, key: &ProblemKey) -> Result<(), MigrationError> {
        tracing::info!(problem = %key, "migrating solutions");

        let solutions = children(self.client, &key.under("solutions"), None).await?;
        let resolutions = children(self.client, &key.under("resolutions"), None).await?;

        for (public_id, payload) in solutions {
            match self
                .migrate_solution(key, &public_id, payload, resolutions.get(&public_id))
                .await
            {
                Ok(()) => {}
                Err(MigrationError::MalformedRecord { path, reason }) => {
                    tracing::warn!(%path, %reason, "skipping solution");
                    self.stats.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn migrate_solution(
        &mut self,
        key: &ProblemKey,
        public_id: &str,
        payload: Value,
        resolution: Option<&Value>,
    ) -> Result<(), MigrationError> {
        let source = format!("{}/{}", key.under("solutions"), public_id);

        let payload: SolutionPayload = serde_json::from_value(payload)
            .map_err(|e| MigrationError::malformed(&source, e.to_string()))?;
        let resolution: Option<LegacyResolution> = resolution
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| {
                MigrationError::malformed(
                    format!("{}/{}", key.under("resolutions"), public_id),
                    e.to_string(),
                )
            })?;

        let solution = QueuedSolution::from_legacy(payload, resolution.as_ref());
        solution.validate(&source)?;

        if solution.meta.verified {
            self.save_verified_solution(key, public_id, solution).await
        } else {
            self.save_solution_and_task(key, public_id, solution).await
        }
    }

    async fn save_verified_solution(
        &mut self,
        key: &ProblemKey,
        public_id: &str,
        solution: QueuedSolution,
    ) -> Result<(), MigrationError> {
        let patch = solution_patch(key, public_id, &solution)?;
        self.client.update(NAMESPACE, patch).await?;
        self.stats.migrated += 1;
        Ok(())
    }

    // Always allocates a fresh task id: re-running after a partial failure
    // can leave an orphaned task for the same solution.
    async fn save_solution_and_task(
        &mut self,
        key: &ProblemKey,
        public_id: &str,
        mut solution: QueuedSolution,
    ) -> Result<(), MigrationError> {
        let task = self.task(key, public_id, &solution).await?;
        let task_id = self.client.push(TASK_QUEUE).await?;
        solution.meta.task_id = Some(task_id.clone());

        let mut patch = solution_patch(key, public_id, &solution)?;
        patch.insert(format!("queues/default/tasks/{}", task_id), to_value(&task)?);
        self.client.update(NAMESPACE, patch).await?;

        tracing::debug!(problem = %key, public_id, %task_id, "queued task");
        self.stats.migrated += 1;
        self.stats.tasks_created += 1;
        Ok(())
    }

    async fn task(
        &self,
        key: &ProblemKey,
        public_id: &str,
        solution: &QueuedSolution,
    ) -> Result<Task, MigrationError> {
        let lookup = format!("auth/publicIds/{}", public_id);
        let owner = match self.client.get(&lookup, None).await? {
            Some(Value::String(uid)) => uid,
            _ => {
                return Err(MigrationError::malformed(
                    lookup,
                    "no user id for this public id",
                ))
            }
        };

        Ok(Task {
            owner,
            payload: solution.payload.clone(),
            created_at: server_timestamp(),
            started: false,
            completed: false,
            consumed: false,
            solution_ref: format!("{}/{}", NAMESPACE, key.queued_solution(public_id)),
            worker: None,
        })
    }
}

fn solution_patch(
    key: &ProblemKey,
    public_id: &str,
    solution: &QueuedSolution,
) -> Result<BTreeMap<String, Value>, MigrationError> {
    Ok(BTreeMap::from([
        (key.queued_solution(public_id), to_value(solution)?),
        (key.profile_ref(public_id), to_value(&SolutionRef::from(solution))?),
    ]))
}

fn to_value<T: Serialize>(record: &T) -> Result<Value, MigrationError> {
    serde_json::to_value(record).map_err(|e| MigrationError::malformed("(encoding)", e.to_string()))
}
