use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::query_error;
use crate::api::response::ApiError;
use crate::AppState;

/// Serve object content (audio playback, site photos) by index path.
/// Route: GET /media/*path
///
/// The index is the source of truth for what exists: paths absent from it
/// are 404 without touching the backend. A backend fetch failure is a
/// per-item error — the dashboard page around it keeps rendering.
pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(path): axum::extract::Path<String>,
) -> Result<Response, ApiError> {
    let record = state
        .query
        .record_by_path(&path)
        .await
        .map_err(query_error)?
        .ok_or_else(|| ApiError::not_found("No such object in the index"))?;

    let data = state
        .object_store
        .get(&record.path)
        .await
        .map_err(|e| match e {
            crate::object_store::ObjectStoreError::NotFound(_) => {
                ApiError::not_found("Object content not found")
            }
            other => ApiError::bad_gateway(format!("Failed to retrieve object: {other}")),
        })?;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        record
            .mime_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    // Set Content-Disposition with filename from the path's last segment
    if let Ok(value) = format!("inline; filename=\"{}\"", record.name).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Recordings and photos are immutable; only the index changes between
    // rebuilds.
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
