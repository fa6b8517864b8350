mod service;

pub use service::QueryService;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::{ContentKind, IndexError, ObjectRecord};

#[derive(Debug, Error)]
pub enum QueryError {
    /// No records matched the supplied filters. Callers render an
    /// empty-state; this is never fatal.
    #[error("No records match the supplied filters")]
    EmptyResult,
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Filter state coming from the dashboard UI. Unset fields mean "no
/// restriction"; every set field becomes a SQL predicate.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub country: Option<String>,
    pub device_id: Option<String>,
    pub kind: Option<ContentKind>,
    /// Inclusive lower bound on the recording timestamp
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the recording timestamp
    pub to: Option<DateTime<Utc>>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.device_id.is_none()
            && self.kind.is_none()
            && self.from.is_none()
            && self.to.is_none()
    }
}

/// Matching records in path order plus engine-computed scalar aggregates.
#[derive(Debug, Serialize)]
pub struct RecordSet {
    pub records: Vec<ObjectRecord>,
    pub summary: RecordSetSummary,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecordSetSummary {
    pub count: i64,
    pub total_size_bytes: i64,
}

/// Whole-dataset recording statistics.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DatasetStats {
    pub total_recordings: i64,
    pub total_size_bytes: i64,
}

/// Per-device recording aggregates for the statistics table.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DeviceStats {
    pub device_id: String,
    pub device_dir: String,
    pub total_recordings: i64,
    pub total_size_bytes: i64,
    pub earliest_recording: Option<DateTime<Utc>>,
    pub latest_recording: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Online,
    Offline,
}

/// One active deployment site joined with its recording activity, for the
/// map view.
#[derive(Debug, Serialize)]
pub struct DeviceStatus {
    pub device_id: String,
    pub device_name: String,
    pub site_name: String,
    pub cluster: Option<String>,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub total_recordings: i64,
    pub last_recording: Option<DateTime<Utc>>,
    pub days_since_last: Option<f64>,
    pub status: DeviceState,
}

/// Summary counters over a set of device statuses.
#[derive(Debug, Serialize)]
pub struct StatusMetrics {
    pub total_devices: usize,
    pub online_devices: usize,
    pub offline_devices: usize,
    pub online_percentage: f64,
}

impl StatusMetrics {
    pub fn from_statuses(statuses: &[DeviceStatus]) -> Self {
        let total_devices = statuses.len();
        let online_devices = statuses
            .iter()
            .filter(|s| s.status == DeviceState::Online)
            .count();
        let online_percentage = if total_devices > 0 {
            online_devices as f64 / total_devices as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_devices,
            online_devices,
            offline_devices: total_devices - online_devices,
            online_percentage,
        }
    }
}

/// Calendar bucketing for the activity heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

impl Granularity {
    /// strftime pattern producing the bucket label.
    pub(crate) fn strftime(self) -> &'static str {
        match self {
            Granularity::Day => "%Y-%m-%d",
            Granularity::Week => "%Y-W%W",
            Granularity::Month => "%Y-%m",
        }
    }
}

/// Recording count for one device in one calendar bucket.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ActivityBucket {
    pub device_id: String,
    pub country: String,
    pub bucket: String,
    pub recordings: i64,
}

/// A site photograph with identity parsed from its file name.
#[derive(Debug, Serialize)]
pub struct SiteImage {
    pub path: String,
    pub device_id: String,
    pub picture_type: Option<String>,
    pub url: String,
}
