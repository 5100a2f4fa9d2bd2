//! Administrative lifecycle handlers.
//!
//! Authorization of these endpoints is left to the surrounding deployment
//! (reverse proxy or an outer middleware layer).

use axum::Json;
use axum::extract::{Path, State};
use tracing::info;

use plughost_core::error::AppError;
use plughost_core::events::{DomainEvent, FileEvent};
use plughost_core::types::ExtensionKind;
use plughost_runtime::{ExtensionSummary, RegistryError, SystemReadinessState};

use crate::dto::request::RelayEventRequest;
use crate::dto::response::{ApiResponse, RelayEventResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Event domains only the runtime itself may publish.
const RESERVED_DOMAINS: [&str; 3] = ["plugin", "theme", "system"];

/// POST /api/admin/extensions/reload
///
/// Tears the registry down and boots again; answers once the new
/// generation has settled.
pub async fn reload(State(state): State<AppState>) -> Json<ApiResponse<SystemReadinessState>> {
    info!("Extension reload requested");
    Json(ApiResponse::ok(state.sequencer.reload().await))
}

/// POST /api/admin/extensions/{id}/activate
///
/// Themes are switched rather than stacked, so at most one stays active.
pub async fn activate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ExtensionSummary>>, ApiError> {
    let current = state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| RegistryError::NotFound { id: id.clone() })?;
    let record = match current.kind() {
        ExtensionKind::Theme => state.registry.switch_theme(&id).await?,
        ExtensionKind::Plugin => state.registry.activate(&id).await?,
    };
    Ok(Json(ApiResponse::ok(record.summary())))
}

/// POST /api/admin/extensions/{id}/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ExtensionSummary>>, ApiError> {
    let record = state.registry.deactivate(&id).await?;
    Ok(Json(ApiResponse::ok(record.summary())))
}

/// POST /api/admin/themes/{id}/activate
pub async fn activate_theme(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ExtensionSummary>>, ApiError> {
    let record = state.registry.switch_theme(&id).await?;
    Ok(Json(ApiResponse::ok(record.summary())))
}

/// POST /api/admin/events
///
/// Relays an extension event onto the bus. The payload is opaque to the
/// host; only names with a typed shape are checked.
pub async fn relay_event(
    State(state): State<AppState>,
    Json(body): Json<RelayEventRequest>,
) -> Result<Json<ApiResponse<RelayEventResponse>>, ApiError> {
    let event = DomainEvent::new(body.name, body.payload);
    validate_event(&event)?;

    let report = state.bus.publish(event.clone()).await;
    info!(
        event = %event.name,
        delivered = report.delivered,
        failed = report.failed,
        "Event relayed"
    );
    Ok(Json(ApiResponse::ok(RelayEventResponse {
        event,
        delivered: report.delivered,
        failed: report.failed,
    })))
}

fn validate_event(event: &DomainEvent) -> Result<(), AppError> {
    let Some((domain, action)) = event.name.split_once(':') else {
        return Err(AppError::validation(format!(
            "Event name '{}' must look like 'domain:action'",
            event.name
        )));
    };
    if domain.is_empty() || action.is_empty() {
        return Err(AppError::validation("Event domain and action must not be empty"));
    }
    if RESERVED_DOMAINS.contains(&domain) {
        return Err(AppError::validation(format!(
            "Events in the '{domain}' domain are published by the runtime only"
        )));
    }
    if event.name == "file:deleted" {
        serde_json::from_value::<FileEvent>(event.payload.clone()).map_err(|e| {
            AppError::validation(format!("Invalid file:deleted payload: {e}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_event_names() {
        assert!(validate_event(&DomainEvent::new("seo:indexed", json!({}))).is_ok());
        assert!(validate_event(&DomainEvent::new("noseparator", json!({}))).is_err());
        assert!(validate_event(&DomainEvent::new(":empty", json!({}))).is_err());
        assert!(validate_event(&DomainEvent::new("plugin:activated", json!({}))).is_err());
    }

    #[test]
    fn test_file_deleted_payload_shape() {
        let good = DomainEvent::new(
            "file:deleted",
            json!({"key": "uploads/a.png", "deleted_at": "2026-01-01T00:00:00Z"}),
        );
        assert!(validate_event(&good).is_ok());

        let camel = DomainEvent::new(
            "file:deleted",
            json!({"key": "uploads/b.png", "deletedAt": "2026-01-01T00:00:00Z"}),
        );
        assert!(validate_event(&camel).is_ok());

        let bad = DomainEvent::new("file:deleted", json!({"key": 3}));
        assert!(validate_event(&bad).is_err());
    }
}
