//! Version orchestrator.
//!
//! Reads the schema version, runs exactly one routine per `next`/`revert`
//! call, and only then records the version the routine reports. The
//! counter write is not atomic with the routine's own writes: a crash in
//! between leaves the counter behind, and the next call re-runs the same
//! routine. Two migrators racing on one store can both run a routine;
//! callers serialize invocations themselves.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use singpath_store::RemoteClient;

use crate::error::MigrationError;
use crate::options::MigrateOptions;
use crate::registry::Registry;
use crate::routine::MigrationRoutine;

/// Store location of the schema version counter.
pub const VERSION_PATH: &str = "meta/version";

/// Version and description of a registered routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutineSummary {
    pub version: u32,
    pub description: String,
}

impl RoutineSummary {
    fn of(routine: &Arc<dyn MigrationRoutine>) -> Self {
        RoutineSummary {
            version: routine.version(),
            description: routine.description().to_string(),
        }
    }
}

/// Where the store stands relative to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub current: u32,
    pub latest: u32,
    pub applied: Vec<RoutineSummary>,
    pub pending: Vec<RoutineSummary>,
}

/// Applies registered routines to one store, one step at a time.
pub struct Migrator<C: RemoteClient> {
    client: C,
    registry: Registry,
    options: MigrateOptions,
    version_path: String,
}

impl<C: RemoteClient> Migrator<C> {
    pub fn new(client: C, registry: Registry, options: MigrateOptions) -> Self {
        Migrator {
            client,
            registry,
            options,
            version_path: VERSION_PATH.to_string(),
        }
    }

    /// Keep the version counter somewhere other than [`VERSION_PATH`].
    pub fn with_version_path(mut self, path: &str) -> Self {
        self.version_path = path.to_string();
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current schema version; 0 when never set.
    pub async fn version(&self) -> Result<u32, MigrationError> {
        match self.client.get(&self.version_path, None).await? {
            None => Ok(0),
            Some(value) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| MigrationError::InvalidVersion {
                    path: self.version_path.clone(),
                    found: value,
                }),
        }
    }

    /// Record `version` as the current schema version.
    pub async fn bump(&self, version: u32) -> Result<u32, MigrationError> {
        self.client
            .set(&self.version_path, Value::from(version), None)
            .await?;
        tracing::info!(version, "schema version recorded");
        Ok(version)
    }

    /// Routines not yet applied at `version`, lowest first.
    pub fn pending_upgrades(&self, version: u32) -> Vec<&Arc<dyn MigrationRoutine>> {
        self.registry.pending(version)
    }

    /// The routine that brought the store to `version`, if any.
    pub fn last_applied_upgrade(&self, version: u32) -> Option<&Arc<dyn MigrationRoutine>> {
        self.registry.last_applied(version)
    }

    /// Apply the lowest pending routine and record its version.
    ///
    /// Resolves to the unchanged version, without writing, when nothing is
    /// pending. Call repeatedly to reach the latest version.
    pub async fn next(&self) -> Result<u32, MigrationError> {
        let version = self.version().await?;
        let Some(routine) = self.pending_upgrades(version).into_iter().next() else {
            tracing::info!(version, "schema is up to date");
            return Ok(version);
        };

        tracing::info!(
            from = version,
            to = routine.version(),
            description = routine.description(),
            "applying upgrade"
        );
        let new_version = match routine.upgrade(&self.client, &self.options).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(to = routine.version(), error = %e, "upgrade failed");
                return Err(e);
            }
        };
        self.bump(new_version).await
    }

    /// Revert the last applied routine and record the version it reports.
    ///
    /// Resolves to the unchanged version, without writing, when no
    /// registered routine has been applied.
    pub async fn revert(&self) -> Result<u32, MigrationError> {
        let version = self.version().await?;
        let Some(routine) = self.last_applied_upgrade(version) else {
            tracing::info!(version, "nothing to revert");
            return Ok(version);
        };

        tracing::info!(
            from = version,
            routine = routine.version(),
            description = routine.description(),
            "reverting upgrade"
        );
        let new_version = match routine.revert(&self.client, &self.options).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(routine = routine.version(), error = %e, "revert failed");
                return Err(e);
            }
        };
        self.bump(new_version).await
    }

    pub async fn status(&self) -> Result<MigrationStatus, MigrationError> {
        let current = self.version().await?;
        let (applied, pending) = self
            .registry
            .routines()
            .iter()
            .partition::<Vec<_>, _>(|r| r.version() <= current);
        Ok(MigrationStatus {
            current,
            latest: self.registry.latest_version(),
            applied: applied.into_iter().map(RoutineSummary::of).collect(),
            pending: pending.into_iter().map(RoutineSummary::of).collect(),
        })
    }
}
