//! HTTP JSON API over the report engine.
//!
//! The caller's identity is established upstream by the gateway, which
//! forwards it as `x-mcr-*` headers. Every report route requires them.
//!
//! Endpoints:
//! - GET    /health
//! - GET    /reports/{reportType}/{state}                      - report summaries
//! - POST   /reports/{reportType}/{state}                      - create a report
//! - GET    /reports/{reportType}/{state}/{id}                 - assembled report
//! - PUT    /reports/{reportType}/{state}/{id}                 - update field data / metadata
//! - POST   /reports/submit/{reportType}/{state}/{id}          - submit
//! - PUT    /reports/release/{reportType}/{state}/{id}         - release a locked report
//! - POST   /reports/{reportType}/{state}/{id}/entities/{entityType}             - add entity
//! - PUT    /reports/{reportType}/{state}/{id}/entities/{entityType}/{entityId}  - edit entity
//! - DELETE /reports/{reportType}/{state}/{id}/entities/{entityType}/{entityId}  - delete entity
//!
//! All responses use Content-Type: application/json.

mod error;
mod handlers;
mod middleware;
mod principal;
mod seed;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{middleware as axum_middleware, Json, Router};
use mcr_engine::ReportEngine;
use mcr_storage::memory::{MemoryContentStore, MemoryMetadataStore, MemoryTemplateStore};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_add_entity, handle_create_report, handle_delete_entity, handle_edit_entity,
    handle_fetch_by_state, handle_fetch_report, handle_health, handle_not_found,
    handle_release_report, handle_submit_report, handle_update_report,
};
use self::middleware::trace_requests;
use self::state::AppState;

/// Default maximum request body size: 1 MB.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

pub(crate) struct ServerConfig {
    pub(crate) port: u16,
    pub(crate) seed: Option<PathBuf>,
    pub(crate) max_body_bytes: usize,
}

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the application router around `state`.
pub(crate) fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/reports/submit/{reportType}/{state}/{id}",
            post(handle_submit_report),
        )
        .route(
            "/reports/release/{reportType}/{state}/{id}",
            put(handle_release_report),
        )
        .route(
            "/reports/{reportType}/{state}",
            get(handle_fetch_by_state).post(handle_create_report),
        )
        .route(
            "/reports/{reportType}/{state}/{id}",
            get(handle_fetch_report).put(handle_update_report),
        )
        .route(
            "/reports/{reportType}/{state}/{id}/entities/{entityType}",
            post(handle_add_entity),
        )
        .route(
            "/reports/{reportType}/{state}/{id}/entities/{entityType}/{entityId}",
            put(handle_edit_entity).delete(handle_delete_entity),
        )
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn(trace_requests))
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Start the HTTP server, preloading the in-memory stores from the seed
/// file when one is configured.
pub(crate) async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = Arc::new(MemoryMetadataStore::new());
    let content = Arc::new(MemoryContentStore::new());
    let templates = Arc::new(MemoryTemplateStore::new());

    if let Some(path) = &config.seed {
        let seeded = seed::load_seed(path, &metadata, &content, &templates).await?;
        tracing::info!(
            path = %path.display(),
            templates = seeded.templates,
            reports = seeded.reports,
            "seed loaded"
        );
    }

    let state = Arc::new(AppState {
        engine: ReportEngine::new(metadata, content, templates),
    });
    let app = router(state, config.max_body_bytes);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        port = config.port,
        max_body_bytes = config.max_body_bytes,
        "report service listening on http://{addr}"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal"),
        Err(e) => {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
