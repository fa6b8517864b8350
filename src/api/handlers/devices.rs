use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{empty_ok, query_error};
use crate::api::response::{ApiError, AppQuery, JSend};
use crate::index::ObjectRecord;
use crate::query::{DeviceStats, DeviceStatus, StatusMetrics};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DeviceStatusResponse {
    pub devices: Vec<DeviceStatus>,
    pub metrics: StatusMetrics,
}

#[derive(Debug, Deserialize)]
pub struct DeviceStatusParams {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceRecordingsParams {
    /// When set, return the recordings closest to this instant instead of
    /// the newest ones.
    #[serde(default)]
    pub closest_to: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub path: String,
    pub name: String,
    pub size: i64,
    pub recorded_at: Option<DateTime<Utc>>,
    pub url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// All active deployment sites with their status, for the map view.
pub async fn device_status(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<DeviceStatusParams>,
) -> Result<Json<JSend<DeviceStatusResponse>>, ApiError> {
    let mut devices = state
        .query
        .device_status(Utc::now(), state.config.data.offline_threshold_days)
        .await
        .map_err(query_error)?;

    if let Some(ref country) = params.country {
        devices.retain(|d| d.country.eq_ignore_ascii_case(country));
    }
    if let Some(ref status) = params.status {
        let wanted = status.to_lowercase();
        devices.retain(|d| {
            matches!(
                (d.status, wanted.as_str()),
                (crate::query::DeviceState::Online, "online")
                    | (crate::query::DeviceState::Offline, "offline")
            )
        });
    }

    let metrics = StatusMetrics::from_statuses(&devices);
    Ok(JSend::success(DeviceStatusResponse { devices, metrics }))
}

/// Recordings for one device: newest first, or nearest a target instant.
/// A device with no recordings yields an empty list, not an error.
pub async fn device_recordings(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    AppQuery(params): AppQuery<DeviceRecordingsParams>,
) -> Result<Json<JSend<Vec<RecordingResponse>>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let records = match params.closest_to {
        Some(target) => {
            empty_ok(
                state
                    .query
                    .closest_recordings(&device_id, target, params.limit)
                    .await,
            )?
        }
        None => {
            let mut records = empty_ok(state.query.recordings_for_device(&device_id).await)?;
            records.truncate(params.limit as usize);
            records
        }
    };

    let recordings = records.iter().map(recording_to_response).collect();
    Ok(JSend::success(recordings))
}

/// Per-device dataset statistics, busiest devices first.
pub async fn device_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<DeviceStats>>>, ApiError> {
    let stats = state.query.device_stats().await.map_err(query_error)?;
    Ok(JSend::success(stats))
}

// ============================================================================
// Helpers
// ============================================================================

fn recording_to_response(record: &ObjectRecord) -> RecordingResponse {
    RecordingResponse {
        path: record.path.clone(),
        name: record.name.clone(),
        size: record.size,
        recorded_at: record.recorded_at,
        url: format!("/media/{}", record.path),
    }
}
