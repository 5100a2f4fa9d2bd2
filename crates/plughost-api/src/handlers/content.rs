//! Extension-owned file delivery.

use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, header};
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::state::AppState;

/// Header naming the content category of a served file.
pub const CONTENT_CATEGORY_HEADER: HeaderName = HeaderName::from_static("x-content-category");

/// GET /api/extensions/{id}/content/{*path}
pub async fn get_content(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let resolved = state.content.resolve(&id, &path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(resolved.content_type)),
            (
                CONTENT_CATEGORY_HEADER,
                HeaderValue::from_static(resolved.category.as_str()),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        resolved.content,
    )
        .into_response())
}
