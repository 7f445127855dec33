//! Orchestrator behaviour: which routine runs, and when the counter moves.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use singpath_migrate::{
    MigrateOptions, MigrationError, MigrationRoutine, Migrator, Registry, RoutineSummary,
};
use singpath_store::{MemoryStore, RemoteClient, StoreError};

// ── Mock routine ──────────────────────────────────────────────────────

/// Routine that counts its invocations and optionally fails.
struct Recording {
    version: u32,
    fail: bool,
    upgrades: AtomicUsize,
    reverts: AtomicUsize,
}

impl Recording {
    fn new(version: u32) -> Arc<Self> {
        Arc::new(Recording {
            version,
            fail: false,
            upgrades: AtomicUsize::new(0),
            reverts: AtomicUsize::new(0),
        })
    }

    fn failing(version: u32) -> Arc<Self> {
        Arc::new(Recording {
            version,
            fail: true,
            upgrades: AtomicUsize::new(0),
            reverts: AtomicUsize::new(0),
        })
    }

    fn upgrades(&self) -> usize {
        self.upgrades.load(Ordering::SeqCst)
    }

    fn reverts(&self) -> usize {
        self.reverts.load(Ordering::SeqCst)
    }

    fn outcome(&self, version: u32) -> Result<u32, MigrationError> {
        if self.fail {
            Err(StoreError::Transport {
                path: format!("routine/{}", self.version),
                message: "connection reset".to_string(),
            }
            .into())
        } else {
            Ok(version)
        }
    }
}

#[async_trait]
impl MigrationRoutine for Recording {
    fn version(&self) -> u32 {
        self.version
    }

    fn description(&self) -> &str {
        "recording routine"
    }

    async fn upgrade(
        &self,
        _client: &dyn RemoteClient,
        _options: &MigrateOptions,
    ) -> Result<u32, MigrationError> {
        self.upgrades.fetch_add(1, Ordering::SeqCst);
        self.outcome(self.version)
    }

    async fn revert(
        &self,
        _client: &dyn RemoteClient,
        _options: &MigrateOptions,
    ) -> Result<u32, MigrationError> {
        self.reverts.fetch_add(1, Ordering::SeqCst);
        self.outcome(self.version - 1)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────

fn routines(versions: &[u32]) -> Vec<Arc<Recording>> {
    versions.iter().map(|&v| Recording::new(v)).collect()
}

fn registry(routines: &[Arc<Recording>]) -> Registry {
    Registry::new(
        routines
            .iter()
            .map(|r| r.clone() as Arc<dyn MigrationRoutine>)
            .collect(),
    )
    .unwrap()
}

fn store_at(version: u32) -> MemoryStore {
    MemoryStore::with_data(json!({"meta": {"version": version}}))
}

fn migrator(store: MemoryStore, routines: &[Arc<Recording>]) -> Migrator<MemoryStore> {
    Migrator::new(store, registry(routines), MigrateOptions::default())
}

// ── version / bump ────────────────────────────────────────────────────

#[tokio::test]
async fn version_reads_counter() {
    let m = migrator(store_at(1), &[]);
    assert_eq!(m.version().await.unwrap(), 1);
}

#[tokio::test]
async fn unset_version_is_zero() {
    let m = migrator(MemoryStore::new(), &[]);
    assert_eq!(m.version().await.unwrap(), 0);
}

#[tokio::test]
async fn version_read_failure_is_transport_error() {
    let store = store_at(1);
    store.fail_on("meta/version");
    let m = migrator(store, &[]);
    match m.version().await {
        Err(MigrationError::Transport(StoreError::Transport { path, .. })) => {
            assert_eq!(path, "meta/version");
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn non_integer_version_is_rejected() {
    let store = MemoryStore::with_data(json!({"meta": {"version": "two"}}));
    let m = migrator(store, &[]);
    assert!(matches!(
        m.version().await,
        Err(MigrationError::InvalidVersion { .. })
    ));
}

#[tokio::test]
async fn bump_writes_counter() {
    let m = migrator(MemoryStore::new(), &[]);
    assert_eq!(m.bump(2).await.unwrap(), 2);
    assert_eq!(m.client().read("meta/version"), Some(json!(2)));
}

#[tokio::test]
async fn bump_failure_is_reported() {
    let store = MemoryStore::new();
    store.fail_on("meta");
    let m = migrator(store, &[]);
    assert!(matches!(
        m.bump(2).await,
        Err(MigrationError::Transport(_))
    ));
}

#[tokio::test]
async fn custom_version_path_is_used() {
    let store = MemoryStore::with_data(json!({"schema": {"v": 3}}));
    let m = migrator(store, &[]).with_version_path("schema/v");
    assert_eq!(m.version().await.unwrap(), 3);
}

// ── next ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn next_with_empty_registry_is_a_no_op() {
    let m = migrator(MemoryStore::new(), &[]);
    assert_eq!(m.next().await.unwrap(), 0);
    assert!(m.client().writes().is_empty());
}

#[tokio::test]
async fn next_runs_lowest_pending_routine_only() {
    let rs = routines(&[6, 0, 5, 4]);
    let m = migrator(store_at(1), &rs);

    assert_eq!(m.next().await.unwrap(), 4);

    assert_eq!(rs[3].upgrades(), 1, "routine v4 runs");
    assert_eq!(rs[0].upgrades() + rs[1].upgrades() + rs[2].upgrades(), 0);
    assert_eq!(m.client().read("meta/version"), Some(json!(4)));
}

#[tokio::test]
async fn next_when_up_to_date_writes_nothing() {
    let rs = routines(&[1, 2]);
    let m = migrator(store_at(2), &rs);

    assert_eq!(m.next().await.unwrap(), 2);
    assert!(rs.iter().all(|r| r.upgrades() == 0));
    assert!(m.client().writes().is_empty());
}

#[tokio::test]
async fn repeated_next_walks_every_routine_once() {
    let rs = routines(&[1, 2, 3]);
    let m = migrator(MemoryStore::new(), &rs);

    assert_eq!(m.next().await.unwrap(), 1);
    assert_eq!(m.next().await.unwrap(), 2);
    assert_eq!(m.next().await.unwrap(), 3);
    assert_eq!(m.next().await.unwrap(), 3);
    assert!(rs.iter().all(|r| r.upgrades() == 1));
}

#[tokio::test]
async fn failed_upgrade_leaves_counter_unchanged() {
    let rs = vec![Recording::failing(2)];
    let m = migrator(store_at(1), &rs);

    match m.next().await {
        Err(MigrationError::Transport(err)) => assert_eq!(err.path(), "routine/2"),
        other => panic!("expected transport error, got {:?}", other),
    }
    assert_eq!(rs[0].upgrades(), 1);
    assert_eq!(m.client().read("meta/version"), Some(json!(1)));
    assert!(m.client().writes().is_empty());
}

// ── revert ────────────────────────────────────────────────────────────

#[tokio::test]
async fn revert_runs_current_routine_and_decrements() {
    let rs = routines(&[1, 3, 5, 6]);
    let m = migrator(store_at(3), &rs);

    assert_eq!(m.revert().await.unwrap(), 2);

    assert_eq!(rs[1].reverts(), 1, "routine v3 reverts");
    assert_eq!(rs.iter().map(|r| r.reverts()).sum::<usize>(), 1);
    assert_eq!(m.client().read("meta/version"), Some(json!(2)));
}

#[tokio::test]
async fn revert_below_first_routine_is_a_no_op() {
    let rs = routines(&[1, 3]);
    let m = migrator(MemoryStore::new(), &rs);

    assert_eq!(m.revert().await.unwrap(), 0);
    assert!(rs.iter().all(|r| r.reverts() == 0));
    assert!(m.client().writes().is_empty());
}

#[tokio::test]
async fn failed_revert_leaves_counter_unchanged() {
    let rs = vec![Recording::failing(2)];
    let m = migrator(store_at(2), &rs);

    assert!(m.revert().await.is_err());
    assert_eq!(m.client().read("meta/version"), Some(json!(2)));
}

// ── status ────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_splits_applied_and_pending() {
    let rs = routines(&[1, 2, 3]);
    let m = migrator(store_at(2), &rs);

    let status = m.status().await.unwrap();
    assert_eq!(status.current, 2);
    assert_eq!(status.latest, 3);
    assert_eq!(
        status.applied.iter().map(|r| r.version).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(
        status.pending,
        vec![RoutineSummary {
            version: 3,
            description: "recording routine".to_string()
        }]
    );
}
