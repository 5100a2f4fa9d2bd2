//! Extension listing and capability handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use plughost_runtime::{ExtensionSummary, RegistryError};

use crate::dto::request::KindQuery;
use crate::dto::response::{ApiResponse, CapabilityListResponse, ExtensionListResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/extensions?kind=
pub async fn list_extensions(
    State(state): State<AppState>,
    Query(query): Query<KindQuery>,
) -> Json<ApiResponse<ExtensionListResponse>> {
    let items: Vec<ExtensionSummary> = state
        .registry
        .list(query.kind)
        .await
        .iter()
        .map(|record| record.summary())
        .collect();
    let total = items.len();
    Json(ApiResponse::ok(ExtensionListResponse { items, total }))
}

/// GET /api/extensions/{id}
pub async fn get_extension(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ExtensionSummary>>, ApiError> {
    let record = state
        .registry
        .get(&id)
        .await
        .ok_or(RegistryError::NotFound { id })?;
    Ok(Json(ApiResponse::ok(record.summary())))
}

/// GET /api/capabilities?kind=
pub async fn list_capabilities(
    State(state): State<AppState>,
    Query(query): Query<KindQuery>,
) -> Json<ApiResponse<CapabilityListResponse>> {
    let items = state.registry.capabilities(query.kind).await;
    let total = items.len();
    Json(ApiResponse::ok(CapabilityListResponse { items, total }))
}
