use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Map view
        .route("/devices", get(handlers::device_status))
        // Audio browser
        .route("/devices/:device_id/recordings", get(handlers::device_recordings))
        .route("/recordings", get(handlers::list_recordings))
        // Summary displays
        .route("/activity", get(handlers::activity))
        .route("/stats/dataset", get(handlers::dataset_stats))
        .route("/stats/devices", get(handlers::device_stats))
        // Site metadata
        .route("/sites", get(handlers::list_sites))
        .route("/sites/:device_id/images", get(handlers::site_images))
        // Media content (audio playback, site photos)
        .route("/media/*path", get(handlers::serve_media))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
