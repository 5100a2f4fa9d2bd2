//! System readiness handlers.

use axum::Json;
use axum::extract::State;

use plughost_runtime::SystemReadinessState;

use crate::dto::response::ApiResponse;
use crate::state::AppState;

/// GET /api/system/readiness
pub async fn readiness(State(state): State<AppState>) -> Json<ApiResponse<SystemReadinessState>> {
    Json(ApiResponse::ok(state.sequencer.state()))
}
