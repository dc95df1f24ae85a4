use std::future::Future;
use std::sync::Arc;

use super::{make_field_data, TestResult};
use crate::{ContentStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "racing_writers_exactly_one_wins",
            racing_writers_exactly_one_wins(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "racing_writers_different_documents_all_succeed",
            racing_writers_different_documents_all_succeed(factory).await,
        ),
    ]
}

// ── Racing compare-and-swap: exactly one wins ───────────────────────────────

/// N tasks read version 0 of the same document and each try to write their
/// own copy. Exactly one write lands; the rest get Conflict, and the stored
/// document is the winner's.
async fn racing_writers_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    store
        .put_field_data(Some("fd-1"), make_field_data("original"), None)
        .await
        .map_err(|e| format!("create: {e}"))?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            let data = make_field_data(&format!("writer-{i}"));
            match s.put_field_data(Some("fd-1"), data, Some(0)).await {
                Ok(_) => Ok(Some(i)),
                Err(StorageError::Conflict { .. }) => Ok(None),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if let Some(i) = outcome {
            winners.push(i);
        }
    }

    if winners.len() != 1 {
        return Err(format!("expected exactly 1 winner, got {}", winners.len()));
    }

    let current = store
        .get_field_data("fd-1")
        .await
        .map_err(|e| format!("get: {e}"))?
        .ok_or("document vanished")?;
    if current.version != 1 {
        return Err(format!("expected version 1, got {}", current.version));
    }
    if current.data != make_field_data(&format!("writer-{}", winners[0])) {
        return Err("stored document is not the winner's".to_string());
    }
    Ok(())
}

// ── Different documents never conflict ───────────────────────────────────────

async fn racing_writers_different_documents_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    for i in 0..N {
        store
            .put_field_data(Some(&format!("fd-{i}")), make_field_data("original"), None)
            .await
            .map_err(|e| format!("create {i}: {e}"))?;
    }

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.put_field_data(Some(&format!("fd-{i}")), make_field_data("updated"), Some(0))
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let stored = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("writer {i}: {e}"))?;
        if stored.version != 1 {
            return Err(format!("writer {i}: expected version 1, got {}", stored.version));
        }
    }
    Ok(())
}
