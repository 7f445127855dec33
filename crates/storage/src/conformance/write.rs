use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use super::{seed, TestResult};
use crate::{QueryLog, RemoteClient, WriteEvent};

pub(super) async fn run_write_tests<C, F, Fut>(factory: &F) -> Vec<TestResult>
where
    C: RemoteClient,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    vec![
        TestResult::from_result(
            "write",
            "set_then_get_round_trips",
            set_then_get_round_trips(factory().await).await,
        ),
        TestResult::from_result(
            "write",
            "set_null_deletes",
            set_null_deletes(factory().await).await,
        ),
        TestResult::from_result(
            "write",
            "update_writes_every_entry",
            update_writes_every_entry(factory().await).await,
        ),
        TestResult::from_result(
            "write",
            "push_ids_unique_and_ordered",
            push_ids_unique_and_ordered(factory().await).await,
        ),
        TestResult::from_result(
            "write",
            "set_reports_to_write_log",
            set_reports_to_write_log(factory().await).await,
        ),
    ]
}

// ── 1. A written subtree reads back unchanged ───────────────────────────────

async fn set_then_get_round_trips<C: RemoteClient>(c: C) -> Result<(), String> {
    let value = json!({"tests": "assert True", "language": "python"});
    seed(&c, "singpath/problems/p/l/q", value.clone()).await?;
    let read = c
        .get("singpath/problems/p/l/q", None)
        .await
        .map_err(|e| e.to_string())?;
    if read != Some(value.clone()) {
        return Err(format!("expected {}, got {:?}", value, read));
    }
    Ok(())
}

// ── 2. Writing null removes the node ────────────────────────────────────────

async fn set_null_deletes<C: RemoteClient>(c: C) -> Result<(), String> {
    seed(&c, "meta/version", json!(1)).await?;
    seed(&c, "meta/version", Value::Null).await?;
    match c.get("meta/version", None).await {
        Ok(None) => Ok(()),
        other => Err(format!("expected Ok(None) after delete, got {:?}", other)),
    }
}

// ── 3. A multi-path update lands every key, deleting null ones ──────────────

async fn update_writes_every_entry<C: RemoteClient>(c: C) -> Result<(), String> {
    seed(&c, "singpath/stale", json!(true)).await?;

    let mut patch = BTreeMap::new();
    patch.insert("queuedSolutions/p/l/q/alice/default".to_string(), json!({"meta": {"solved": false}}));
    patch.insert("userProfiles/alice/queuedSolutions/p/l/q/default".to_string(), json!({"solved": false}));
    patch.insert("stale".to_string(), Value::Null);
    c.update("singpath", patch)
        .await
        .map_err(|e| format!("update failed: {}", e))?;

    for path in [
        "singpath/queuedSolutions/p/l/q/alice/default",
        "singpath/userProfiles/alice/queuedSolutions/p/l/q/default",
    ] {
        match c.get(path, None).await {
            Ok(Some(_)) => {}
            other => return Err(format!("expected '{}' to exist, got {:?}", path, other)),
        }
    }
    match c.get("singpath/stale", None).await {
        Ok(None) => Ok(()),
        other => Err(format!("expected 'singpath/stale' deleted, got {:?}", other)),
    }
}

// ── 4. push ids never repeat and sort in allocation order ───────────────────

async fn push_ids_unique_and_ordered<C: RemoteClient>(c: C) -> Result<(), String> {
    let mut previous: Option<String> = None;
    for _ in 0..50 {
        let id = c
            .push("singpath/queues/default/tasks")
            .await
            .map_err(|e| e.to_string())?;
        if let Some(prev) = &previous {
            if &id <= prev {
                return Err(format!("push id {} does not sort after {}", id, prev));
            }
        }
        previous = Some(id);
    }
    Ok(())
}

// ── 5. set invokes the write log with the outcome ───────────────────────────

async fn set_reports_to_write_log<C: RemoteClient>(c: C) -> Result<(), String> {
    let events: Arc<Mutex<Vec<WriteEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let log: QueryLog = Arc::new(move |e: &WriteEvent| {
        if let Ok(mut events) = sink.lock() {
            events.push(e.clone());
        }
    });

    c.set("/singpath/problems/p/l/q/tests/", json!("x"), Some(&log))
        .await
        .map_err(|e| e.to_string())?;

    let events = events.lock().map_err(|e| e.to_string())?;
    match events.as_slice() {
        [event]
            if event.success
                && event.data == json!("x")
                && event.path == "singpath/problems/p/l/q/tests"
                && event.base_uri == c.base_uri() =>
        {
            Ok(())
        }
        other => Err(format!(
            "expected one successful event at 'singpath/problems/p/l/q/tests', got {:?}",
            other
        )),
    }
}
