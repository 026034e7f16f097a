//! REST API handlers.
//!
//! Lineage endpoints share one pipeline: validate the body, build a resolver
//! for the request, then run the engine and the requested projection on the
//! blocking pool under the configured timeout.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use lineagekit_core::{ColumnResolver, Dialect, NoopResolver};

use super::AppState;
use crate::catalog::MetadataResolver;
use crate::error::{megabytes, ApiError};
use crate::models::{
    CacheClearedResponse, ColumnLineageResponse, ColumnPairsResponse, DialectsResponse,
    HealthResponse, LineageRequest, ServiceInfo, TableLineageResponse,
};
use crate::service::{AnalysisInput, LineageService};

pub const SERVICE_NAME: &str = "lineagekit";

/// Routes mounted at the root: health and service descriptor.
pub fn root_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/", get(service_info))
}

/// Routes mounted under `/api/v1`.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/lineage/column-pairs", post(column_pairs))
        .route("/lineage/table", post(table_lineage))
        .route("/lineage/column", post(column_lineage))
        .route("/dialects", get(dialects))
        .route("/metadata/cache", delete(clear_cache))
}

// === Handlers ===

/// GET /health - Liveness, exempt from rate limiting
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        catalog_configured: state.catalog_configured(),
    })
}

/// GET / - Service descriptor
async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        health: "/health".to_string(),
    })
}

/// POST /api/v1/lineage/column-pairs - Column pairs view
async fn column_pairs(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LineageRequest>, JsonRejection>,
) -> Result<Json<ColumnPairsResponse>, ApiError> {
    let request = validate(&state, payload)?;
    run_lineage(&state, request, |service, input| service.column_pairs(input))
        .await
        .map(Json)
}

/// POST /api/v1/lineage/table - Source and target tables
async fn table_lineage(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LineageRequest>, JsonRejection>,
) -> Result<Json<TableLineageResponse>, ApiError> {
    let request = validate(&state, payload)?;
    run_lineage(&state, request, |service, input| service.table_lineage(input))
        .await
        .map(Json)
}

/// POST /api/v1/lineage/column - Full column lineage paths
async fn column_lineage(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LineageRequest>, JsonRejection>,
) -> Result<Json<ColumnLineageResponse>, ApiError> {
    let request = validate(&state, payload)?;
    run_lineage(&state, request, |service, input| service.column_lineage(input))
        .await
        .map(Json)
}

/// GET /api/v1/dialects - Accepted dialect names
async fn dialects() -> Json<DialectsResponse> {
    Json(DialectsResponse {
        dialects: Dialect::supported_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

/// DELETE /api/v1/metadata/cache - Drop every cached table definition
async fn clear_cache(State(state): State<Arc<AppState>>) -> (StatusCode, Json<CacheClearedResponse>) {
    let cleared_entries = state.cache.clear();
    (StatusCode::OK, Json(CacheClearedResponse { cleared_entries }))
}

// === Pipeline ===

fn validate(
    state: &AppState,
    payload: Result<Json<LineageRequest>, JsonRejection>,
) -> Result<LineageRequest, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BodyLimit {
                max_mb: state.config.max_request_size_mb,
            }
        } else {
            ApiError::Validation(rejection.body_text())
        }
    })?;

    if request.sql.trim().is_empty() {
        return Err(ApiError::Validation(
            "SQL cannot be empty or just whitespace".to_string(),
        ));
    }

    let size = request.sql.len();
    if size > state.config.max_request_bytes() {
        return Err(ApiError::SqlTooLarge {
            size_mb: megabytes(size),
            max_mb: state.config.max_request_size_mb,
        });
    }
    Ok(request)
}

async fn run_lineage<T, F>(state: &AppState, request: LineageRequest, view: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&LineageService<'_>, &AnalysisInput) -> T + Send + 'static,
{
    let catalog = if request.catalog_enabled {
        state.catalog.clone()
    } else {
        None
    };
    let cache = Arc::clone(&state.cache);
    let input = AnalysisInput {
        sql: request.sql,
        dialect: request
            .dialect
            .unwrap_or_else(|| state.config.default_dialect.clone()),
        silent_mode: request.silent_mode,
    };

    let task = tokio::task::spawn_blocking(move || {
        let resolver: Box<dyn ColumnResolver> = match catalog {
            Some(client) => Box::new(MetadataResolver::connect(client, cache)),
            None => Box::new(NoopResolver),
        };
        let service = LineageService::new(resolver.as_ref());
        view(&service, &input)
    });

    let timeout = state.config.request_timeout();
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(join_error)) => Err(ApiError::Internal(join_error.to_string())),
        Err(_) => Err(ApiError::Timeout(timeout.as_secs())),
    }
}
