//! HTTP route handlers. Each one extracts the caller and path parameters,
//! hands them to the engine, and serializes the outcome.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use mcr_engine::error::NO_KEY;
use mcr_engine::{
    CreateReportRequest, EntityChange, EntityParams, KeyParams, ReportError, ScopeParams,
    UpdateReportRequest,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::ApiError;
use super::json_error;
use super::principal::Caller;
use super::state::AppState;

/// Body of entity add and edit requests.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EntityBody {
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(default)]
    expected_version: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VersionQuery {
    #[serde(default)]
    expected_version: Option<u64>,
}

/// Fallback handler for unmatched routes.
///
/// Report paths with an empty segment never match a route, but they are a
/// missing key rather than an unknown resource.
pub(crate) async fn handle_not_found(uri: Uri) -> Response {
    let missing_key = uri
        .path()
        .strip_prefix("/reports/")
        .is_some_and(|rest| rest.split('/').any(str::is_empty));
    if missing_key {
        return ApiError::from(ReportError::malformed(NO_KEY)).into_response();
    }
    json_error(StatusCode::NOT_FOUND, "not found").into_response()
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// GET /reports/{reportType}/{state}
pub(crate) async fn handle_fetch_by_state(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(params): Path<ScopeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.engine.fetch_by_state(&principal, &params).await?;
    Ok(Json(summaries))
}

/// POST /reports/{reportType}/{state}
pub(crate) async fn handle_create_report(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(params): Path<ScopeParams>,
    body: Result<Json<CreateReportRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let report = state
        .engine
        .create_report(&principal, &params, request)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /reports/{reportType}/{state}/{id}
pub(crate) async fn handle_fetch_report(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(params): Path<KeyParams>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.engine.fetch_one(&principal, &params).await?;
    Ok(Json(report))
}

/// PUT /reports/{reportType}/{state}/{id}
pub(crate) async fn handle_update_report(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(params): Path<KeyParams>,
    body: Result<Json<UpdateReportRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let report = state
        .engine
        .update_report(&principal, &params, request)
        .await?;
    Ok(Json(report))
}

/// POST /reports/submit/{reportType}/{state}/{id}
pub(crate) async fn handle_submit_report(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(params): Path<KeyParams>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.engine.submit_report(&principal, &params).await?;
    Ok(Json(report))
}

/// PUT /reports/release/{reportType}/{state}/{id}
pub(crate) async fn handle_release_report(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(params): Path<KeyParams>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.engine.release_report(&principal, &params).await?;
    Ok(Json(report))
}

/// POST /reports/{reportType}/{state}/{id}/entities/{entityType}
pub(crate) async fn handle_add_entity(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(params): Path<EntityParams>,
    body: Result<Json<EntityBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let outcome = state
        .engine
        .save_entity_change(
            &principal,
            &params,
            EntityChange::Add {
                fields: body.fields,
            },
            body.expected_version,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// PUT /reports/{reportType}/{state}/{id}/entities/{entityType}/{entityId}
pub(crate) async fn handle_edit_entity(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(params): Path<EntityParams>,
    body: Result<Json<EntityBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let entity_id = params.parse_entity_id()?;
    let outcome = state
        .engine
        .save_entity_change(
            &principal,
            &params,
            EntityChange::Edit {
                entity_id,
                fields: body.fields,
            },
            body.expected_version,
        )
        .await?;
    Ok(Json(outcome))
}

/// DELETE /reports/{reportType}/{state}/{id}/entities/{entityType}/{entityId}
///
/// The expected field-data version, if any, travels as `?expectedVersion=`.
pub(crate) async fn handle_delete_entity(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(params): Path<EntityParams>,
    query: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let entity_id = params.parse_entity_id()?;
    let outcome = state
        .engine
        .save_entity_change(
            &principal,
            &params,
            EntityChange::Delete { entity_id },
            query.expected_version,
        )
        .await?;
    Ok(Json(outcome))
}
