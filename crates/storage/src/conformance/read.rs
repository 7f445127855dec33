use std::future::Future;

use serde_json::json;

use super::{seed, TestResult};
use crate::{Query, RemoteClient};

pub(super) async fn run_read_tests<C, F, Fut>(factory: &F) -> Vec<TestResult>
where
    C: RemoteClient,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    vec![
        TestResult::from_result(
            "read",
            "absent_node_is_none",
            absent_node_is_none(factory().await).await,
        ),
        TestResult::from_result(
            "read",
            "shallow_returns_child_keys",
            shallow_returns_child_keys(factory().await).await,
        ),
        TestResult::from_result(
            "read",
            "shallow_on_absent_node_is_none",
            shallow_on_absent_node_is_none(factory().await).await,
        ),
        TestResult::from_result(
            "read",
            "order_by_selects_matching_children",
            order_by_selects_matching_children(factory().await).await,
        ),
    ]
}

// ── 1. A node that was never written reads as None ──────────────────────────

async fn absent_node_is_none<C: RemoteClient>(c: C) -> Result<(), String> {
    match c.get("meta/version", None).await {
        Ok(None) => Ok(()),
        other => Err(format!("expected Ok(None), got {:?}", other)),
    }
}

// ── 2. Shallow reads list children as `true` ────────────────────────────────

async fn shallow_returns_child_keys<C: RemoteClient>(c: C) -> Result<(), String> {
    seed(
        &c,
        "singpath/levels/p1",
        json!({"l1": {"title": "one"}, "l2": {"title": "two"}}),
    )
    .await?;

    let listing = c
        .get("singpath/levels/p1", Some(&Query::Shallow))
        .await
        .map_err(|e| e.to_string())?;
    let expected = json!({"l1": true, "l2": true});
    if listing != Some(expected.clone()) {
        return Err(format!("expected {}, got {:?}", expected, listing));
    }
    Ok(())
}

// ── 3. Shallow read of an absent node is None, not an empty listing ─────────

async fn shallow_on_absent_node_is_none<C: RemoteClient>(c: C) -> Result<(), String> {
    match c.get("singpath/levels/none", Some(&Query::Shallow)).await {
        Ok(None) => Ok(()),
        other => Err(format!("expected Ok(None), got {:?}", other)),
    }
}

// ── 4. orderBy/equalTo keeps only children with the matching field ──────────

async fn order_by_selects_matching_children<C: RemoteClient>(c: C) -> Result<(), String> {
    seed(
        &c,
        "singpath/queues/default/tasks",
        json!({
            "open": {"completed": false, "owner": "a"},
            "done": {"completed": true, "owner": "b"}
        }),
    )
    .await?;

    let tasks = c
        .get(
            "singpath/queues/default/tasks",
            Some(&Query::order_by("completed", false)),
        )
        .await
        .map_err(|e| e.to_string())?
        .ok_or("expected the open task, got None")?;

    let keys: Vec<&String> = tasks
        .as_object()
        .ok_or("expected an object")?
        .keys()
        .collect();
    if keys != ["open"] {
        return Err(format!("expected only [\"open\"], got {:?}", keys));
    }
    Ok(())
}
