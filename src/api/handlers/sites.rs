use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use super::{empty_ok, query_error};
use crate::api::response::{ApiError, JSend};
use crate::index::Site;
use crate::query::SiteImage;
use crate::AppState;

/// Active deployment sites, for the site-metadata table.
pub async fn list_sites(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<Site>>>, ApiError> {
    let sites = state.query.sites().await.map_err(query_error)?;
    Ok(JSend::success(sites))
}

/// Photographs for one site's device. Sites without photos yield an empty
/// gallery, not an error.
pub async fn site_images(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<JSend<Vec<SiteImage>>>, ApiError> {
    let images = empty_ok(state.query.site_images(&device_id).await)?;
    Ok(JSend::success(images))
}
