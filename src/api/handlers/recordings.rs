use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{empty_ok, query_error};
use crate::api::response::{ApiError, AppQuery, JSend, JSendPaginated, Pagination};
use crate::index::{ContentKind, ObjectRecord};
use crate::query::{ActivityBucket, DatasetStats, FilterSpec, Granularity};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecordFilterParams {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub granularity: Granularity,
}

fn default_limit() -> u32 {
    100
}

// ============================================================================
// Handlers
// ============================================================================

/// Filterable listing over the whole index, path-ascending and paginated.
pub async fn list_recordings(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<RecordFilterParams>,
) -> Result<Json<JSendPaginated<ObjectRecord>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let filter = filter_from_params(
        params.country,
        params.device_id,
        params.kind.as_deref(),
        params.from,
        params.to,
    )?;

    let (records, total) = match state.query.records(&filter).await {
        Ok(set) => (set.records, set.summary.count as u64),
        Err(crate::query::QueryError::EmptyResult) => (Vec::new(), 0),
        Err(other) => return Err(query_error(other)),
    };

    let items: Vec<ObjectRecord> = records
        .into_iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

/// Whole-dataset audio statistics under the supplied filters.
pub async fn dataset_stats(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<RecordFilterParams>,
) -> Result<Json<JSend<DatasetStats>>, ApiError> {
    let filter = filter_from_params(params.country, params.device_id, None, params.from, params.to)?;
    let stats = state
        .query
        .dataset_stats(&filter)
        .await
        .map_err(query_error)?;
    Ok(JSend::success(stats))
}

/// Recording counts per device and calendar bucket, for the activity
/// heatmap. Buckets before the configured start date are excluded.
pub async fn activity(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ActivityParams>,
) -> Result<Json<JSend<Vec<ActivityBucket>>>, ApiError> {
    let start = state
        .config
        .data
        .start_date
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc());

    let filter = FilterSpec {
        country: params.country,
        device_id: params.device_id,
        kind: None,
        from: params.from.or(start),
        to: params.to,
    };

    let buckets = empty_ok(state.query.activity(&filter, params.granularity).await)?;
    Ok(JSend::success(buckets))
}

// ============================================================================
// Helpers
// ============================================================================

fn filter_from_params(
    country: Option<String>,
    device_id: Option<String>,
    kind: Option<&str>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<FilterSpec, ApiError> {
    let kind = match kind {
        Some(raw) => Some(ContentKind::parse(raw).ok_or_else(|| {
            ApiError::bad_request(format!(
                "kind must be one of audio, image, metadata, other; got '{raw}'"
            ))
        })?),
        None => None,
    };

    Ok(FilterSpec {
        country,
        device_id,
        kind,
        from,
        to,
    })
}
