use std::future::Future;

use super::{make_metadata, TestResult};
use crate::record::{ReportKey, ReportStatus, ReportType};
use crate::MetadataStore;

pub(super) async fn run_metadata_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: MetadataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "metadata",
            "get_absent_key_returns_none",
            get_absent_key_returns_none(factory).await,
        ),
        TestResult::from_result(
            "metadata",
            "put_then_get_round_trips",
            put_then_get_round_trips(factory).await,
        ),
        TestResult::from_result(
            "metadata",
            "put_replaces_existing_record",
            put_replaces_existing_record(factory).await,
        ),
        TestResult::from_result(
            "metadata",
            "query_is_scoped_to_type_and_state",
            query_is_scoped_to_type_and_state(factory).await,
        ),
        TestResult::from_result(
            "metadata",
            "query_unknown_state_is_empty",
            query_unknown_state_is_empty(factory).await,
        ),
    ]
}

async fn get_absent_key_returns_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MetadataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let found = store
        .get_metadata(&ReportKey::new(ReportType::Mcpar, "AB", "missing"))
        .await
        .map_err(|e| format!("get: {e}"))?;
    if found.is_some() {
        return Err("expected None for an absent key".to_string());
    }
    Ok(())
}

async fn put_then_get_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MetadataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut md = make_metadata(ReportType::Mlr, "AB", "r1");
    md.extra
        .insert("reportingPeriodStartDate".to_string(), 1640995200000u64.into());
    store
        .put_metadata(md.clone())
        .await
        .map_err(|e| format!("put: {e}"))?;

    let found = store
        .get_metadata(&md.key())
        .await
        .map_err(|e| format!("get: {e}"))?
        .ok_or("record missing after put")?;
    if found != md {
        return Err(format!("round trip mismatch: {found:?} != {md:?}"));
    }
    Ok(())
}

async fn put_replaces_existing_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MetadataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut md = make_metadata(ReportType::Mcpar, "AB", "r1");
    store
        .put_metadata(md.clone())
        .await
        .map_err(|e| format!("put 1: {e}"))?;

    md.status = ReportStatus::InProgress;
    md.last_altered_by = "Another User".to_string();
    store
        .put_metadata(md.clone())
        .await
        .map_err(|e| format!("put 2: {e}"))?;

    let all = store
        .query_metadata(ReportType::Mcpar, "AB")
        .await
        .map_err(|e| format!("query: {e}"))?;
    if all.len() != 1 {
        return Err(format!("expected 1 record after replace, got {}", all.len()));
    }
    if all[0].status != ReportStatus::InProgress || all[0].last_altered_by != "Another User" {
        return Err(format!("replacement not visible: {:?}", all[0]));
    }
    Ok(())
}

async fn query_is_scoped_to_type_and_state<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MetadataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    for md in [
        make_metadata(ReportType::Mcpar, "AB", "r1"),
        make_metadata(ReportType::Mcpar, "AB", "r2"),
        make_metadata(ReportType::Mcpar, "CD", "r3"),
        make_metadata(ReportType::Mlr, "AB", "r4"),
    ] {
        store
            .put_metadata(md)
            .await
            .map_err(|e| format!("put: {e}"))?;
    }

    let found = store
        .query_metadata(ReportType::Mcpar, "AB")
        .await
        .map_err(|e| format!("query: {e}"))?;
    let mut ids: Vec<&str> = found.iter().map(|m| m.id.as_str()).collect();
    ids.sort_unstable();
    if ids != ["r1", "r2"] {
        return Err(format!("expected [r1, r2], got {ids:?}"));
    }
    Ok(())
}

async fn query_unknown_state_is_empty<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MetadataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .put_metadata(make_metadata(ReportType::Naaar, "AB", "r1"))
        .await
        .map_err(|e| format!("put: {e}"))?;
    let found = store
        .query_metadata(ReportType::Naaar, "ZZ")
        .await
        .map_err(|e| format!("query: {e}"))?;
    if !found.is_empty() {
        return Err(format!("expected no records, got {}", found.len()));
    }
    Ok(())
}
