use std::future::Future;

use super::{make_field_data, TestResult};
use crate::{ContentStore, StorageError};

pub(super) async fn run_content_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "content",
            "get_absent_id_returns_none",
            get_absent_id_returns_none(factory).await,
        ),
        TestResult::from_result(
            "content",
            "put_without_id_mints_at_version_0",
            put_without_id_mints_at_version_0(factory).await,
        ),
        TestResult::from_result(
            "content",
            "minted_ids_are_distinct",
            minted_ids_are_distinct(factory).await,
        ),
        TestResult::from_result(
            "content",
            "matching_version_increments",
            matching_version_increments(factory).await,
        ),
        TestResult::from_result(
            "content",
            "stale_version_conflicts_without_writing",
            stale_version_conflicts_without_writing(factory).await,
        ),
        TestResult::from_result(
            "content",
            "unconditional_put_always_succeeds",
            unconditional_put_always_succeeds(factory).await,
        ),
        TestResult::from_result(
            "content",
            "conditional_put_on_absent_id_is_missing",
            conditional_put_on_absent_id_is_missing(factory).await,
        ),
    ]
}

async fn get_absent_id_returns_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store.get_field_data("no-such-id").await {
        Ok(None) => Ok(()),
        Ok(Some(doc)) => Err(format!("expected None, got {doc:?}")),
        Err(e) => Err(format!("get: {e}")),
    }
}

async fn put_without_id_mints_at_version_0<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let data = make_field_data("testProgram");
    let stored = store
        .put_field_data(None, data.clone(), None)
        .await
        .map_err(|e| format!("put: {e}"))?;
    if stored.id.is_empty() {
        return Err("minted id is empty".to_string());
    }
    if stored.version != 0 {
        return Err(format!("expected version 0, got {}", stored.version));
    }

    let found = store
        .get_field_data(&stored.id)
        .await
        .map_err(|e| format!("get: {e}"))?
        .ok_or("document missing after put")?;
    if found.data != data || found.version != 0 {
        return Err(format!("round trip mismatch: {found:?}"));
    }
    Ok(())
}

async fn minted_ids_are_distinct<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut ids = std::collections::HashSet::new();
    for i in 0..20 {
        let stored = store
            .put_field_data(None, make_field_data(&format!("p{i}")), None)
            .await
            .map_err(|e| format!("put {i}: {e}"))?;
        if !ids.insert(stored.id.clone()) {
            return Err(format!("minted id {} twice", stored.id));
        }
    }
    Ok(())
}

async fn matching_version_increments<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let created = store
        .put_field_data(Some("fd-1"), make_field_data("v0"), None)
        .await
        .map_err(|e| format!("create: {e}"))?;

    let mut version = created.version;
    for round in 1..=3u64 {
        let stored = store
            .put_field_data(Some("fd-1"), make_field_data("next"), Some(version))
            .await
            .map_err(|e| format!("update {round}: {e}"))?;
        if stored.version != created.version + round {
            return Err(format!(
                "expected version {}, got {}",
                created.version + round,
                stored.version
            ));
        }
        if stored.id != "fd-1" {
            return Err(format!("id changed on update: {}", stored.id));
        }
        version = stored.version;
    }
    Ok(())
}

async fn stale_version_conflicts_without_writing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .put_field_data(Some("fd-1"), make_field_data("original"), None)
        .await
        .map_err(|e| format!("create: {e}"))?;
    store
        .put_field_data(Some("fd-1"), make_field_data("first writer"), Some(0))
        .await
        .map_err(|e| format!("first writer: {e}"))?;

    match store
        .put_field_data(Some("fd-1"), make_field_data("second writer"), Some(0))
        .await
    {
        Err(StorageError::Conflict {
            expected_version: 0,
            actual_version: 1,
            ..
        }) => {}
        Err(e) => return Err(format!("expected Conflict(0 vs 1), got {e}")),
        Ok(doc) => return Err(format!("stale write accepted: {doc:?}")),
    }

    let current = store
        .get_field_data("fd-1")
        .await
        .map_err(|e| format!("get: {e}"))?
        .ok_or("document vanished")?;
    if current.data != make_field_data("first writer") || current.version != 1 {
        return Err(format!("conflicting write leaked: {current:?}"));
    }
    Ok(())
}

async fn unconditional_put_always_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .put_field_data(Some("fd-1"), make_field_data("a"), None)
        .await
        .map_err(|e| format!("put 1: {e}"))?;
    store
        .put_field_data(Some("fd-1"), make_field_data("b"), Some(0))
        .await
        .map_err(|e| format!("put 2: {e}"))?;
    let last = store
        .put_field_data(Some("fd-1"), make_field_data("c"), None)
        .await
        .map_err(|e| format!("put 3: {e}"))?;
    if last.version != 2 {
        return Err(format!("expected version 2, got {}", last.version));
    }
    Ok(())
}

async fn conditional_put_on_absent_id_is_missing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store
        .put_field_data(Some("ghost"), make_field_data("x"), Some(0))
        .await
    {
        Err(StorageError::DocumentMissing { .. }) => {}
        Err(e) => return Err(format!("expected DocumentMissing, got {e}")),
        Ok(doc) => return Err(format!("write to absent id accepted: {doc:?}")),
    }
    if store
        .get_field_data("ghost")
        .await
        .map_err(|e| format!("get: {e}"))?
        .is_some()
    {
        return Err("rejected write created the document".to_string());
    }
    Ok(())
}
