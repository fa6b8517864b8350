use chrono::{DateTime, Utc};
use sqlx::sqlite::Sqlite;
use sqlx::QueryBuilder;

use super::{
    ActivityBucket, DatasetStats, DeviceState, DeviceStats, DeviceStatus, FilterSpec, Granularity,
    QueryError, RecordSet, RecordSetSummary, SiteImage,
};
use crate::index::{parse_image_name, IndexStore, ObjectRecord, Site};

const RECORD_COLUMNS: &str = "path, name, size, modified_at, etag, mime_type, kind, project, \
                              country, device_dir, device_id, recorded_at";

/// Read-only query surface over the metadata index. Every operation pushes
/// its predicates into a single SQL statement and lets the engine order,
/// group, and aggregate.
#[derive(Debug, Clone)]
pub struct QueryService {
    store: IndexStore,
}

impl QueryService {
    pub fn new(store: IndexStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Fetch all records matching `filter`, path-ascending, together with
    /// engine-computed count and total size. Errors with `EmptyResult` when
    /// nothing matches.
    pub async fn records(&self, filter: &FilterSpec) -> Result<RecordSet, QueryError> {
        let mut conn = self.store.connect().await?;

        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {RECORD_COLUMNS} FROM objects WHERE 1 = 1"));
        push_filters(&mut query, filter);
        query.push(" ORDER BY path ASC");

        let records: Vec<ObjectRecord> = query.build_query_as().fetch_all(&mut conn).await?;
        if records.is_empty() {
            return Err(QueryError::EmptyResult);
        }

        let mut agg = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS count, COALESCE(SUM(size), 0) AS total_size_bytes \
             FROM objects WHERE 1 = 1",
        );
        push_filters(&mut agg, filter);
        let summary: RecordSetSummary = agg.build_query_as().fetch_one(&mut conn).await?;

        Ok(RecordSet { records, summary })
    }

    /// Look up a single record by its exact path.
    pub async fn record_by_path(&self, path: &str) -> Result<Option<ObjectRecord>, QueryError> {
        let mut conn = self.store.connect().await?;
        let record = sqlx::query_as::<_, ObjectRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM objects WHERE path = ?"
        ))
        .bind(path)
        .fetch_optional(&mut conn)
        .await?;
        Ok(record)
    }

    /// Whole-dataset audio statistics under the supplied filters. Returns
    /// zeroes rather than an error when nothing matches.
    pub async fn dataset_stats(&self, filter: &FilterSpec) -> Result<DatasetStats, QueryError> {
        let mut conn = self.store.connect().await?;

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS total_recordings, COALESCE(SUM(size), 0) AS total_size_bytes \
             FROM objects WHERE kind = 'audio'",
        );
        push_filters(&mut query, filter);

        let stats = query.build_query_as().fetch_one(&mut conn).await?;
        Ok(stats)
    }

    /// Per-device audio aggregates, busiest devices first.
    pub async fn device_stats(&self) -> Result<Vec<DeviceStats>, QueryError> {
        let mut conn = self.store.connect().await?;

        let stats = sqlx::query_as(
            "SELECT device_id, device_dir, COUNT(*) AS total_recordings, \
                    COALESCE(SUM(size), 0) AS total_size_bytes, \
                    MIN(recorded_at) AS earliest_recording, \
                    MAX(recorded_at) AS latest_recording \
             FROM objects \
             WHERE kind = 'audio' AND device_id IS NOT NULL AND device_dir IS NOT NULL \
             GROUP BY device_id, device_dir \
             ORDER BY total_recordings DESC",
        )
        .fetch_all(&mut conn)
        .await?;

        Ok(stats)
    }

    /// Every active site left-joined with its recording activity. Sites with
    /// no recordings appear as offline with a zero count, so the map always
    /// shows the full deployment.
    pub async fn device_status(
        &self,
        now: DateTime<Utc>,
        offline_threshold_days: i64,
    ) -> Result<Vec<DeviceStatus>, QueryError> {
        let mut conn = self.store.connect().await?;

        #[derive(sqlx::FromRow)]
        struct StatusRow {
            device_id: String,
            site_name: String,
            cluster: Option<String>,
            country: String,
            latitude: Option<f64>,
            longitude: Option<f64>,
            device_dir: Option<String>,
            total_recordings: Option<i64>,
            last_recording: Option<DateTime<Utc>>,
        }

        let rows: Vec<StatusRow> = sqlx::query_as(
            "SELECT s.device_id, s.site_name, s.cluster, s.country, s.latitude, s.longitude, \
                    a.device_dir, a.total_recordings, a.last_recording \
             FROM sites s \
             LEFT JOIN ( \
                 SELECT device_id, MAX(device_dir) AS device_dir, \
                        COUNT(*) AS total_recordings, MAX(recorded_at) AS last_recording \
                 FROM objects \
                 WHERE kind = 'audio' AND recorded_at IS NOT NULL \
                 GROUP BY device_id \
             ) a ON a.device_id = s.device_id \
             WHERE s.active = 1 \
             ORDER BY s.device_id ASC",
        )
        .fetch_all(&mut conn)
        .await?;

        let threshold = chrono::Duration::days(offline_threshold_days);
        let statuses = rows
            .into_iter()
            .map(|row| {
                let status = match row.last_recording {
                    Some(last) if now - last <= threshold => DeviceState::Online,
                    _ => DeviceState::Offline,
                };
                let days_since_last = row
                    .last_recording
                    .map(|last| (now - last).num_seconds() as f64 / 86_400.0);
                DeviceStatus {
                    device_name: row
                        .device_dir
                        .unwrap_or_else(|| format!("RPiID-{}", row.device_id)),
                    device_id: row.device_id,
                    site_name: row.site_name,
                    cluster: row.cluster,
                    country: row.country,
                    latitude: row.latitude,
                    longitude: row.longitude,
                    total_recordings: row.total_recordings.unwrap_or(0),
                    last_recording: row.last_recording,
                    days_since_last,
                    status,
                }
            })
            .collect();

        Ok(statuses)
    }

    /// Recording counts grouped by device and calendar bucket, for the
    /// activity heatmap.
    pub async fn activity(
        &self,
        filter: &FilterSpec,
        granularity: Granularity,
    ) -> Result<Vec<ActivityBucket>, QueryError> {
        let mut conn = self.store.connect().await?;

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT device_id, country, strftime('{}', recorded_at) AS bucket, \
             COUNT(*) AS recordings \
             FROM objects \
             WHERE kind = 'audio' AND device_id IS NOT NULL AND recorded_at IS NOT NULL",
            granularity.strftime()
        ));
        push_filters(&mut query, filter);
        query.push(" GROUP BY device_id, country, bucket ORDER BY device_id ASC, bucket ASC");

        let buckets = query.build_query_as().fetch_all(&mut conn).await?;
        Ok(buckets)
    }

    /// All recordings for one device, newest first. Errors with
    /// `EmptyResult` for devices that have never recorded.
    pub async fn recordings_for_device(
        &self,
        device_id: &str,
    ) -> Result<Vec<ObjectRecord>, QueryError> {
        let mut conn = self.store.connect().await?;

        let records: Vec<ObjectRecord> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM objects \
             WHERE kind = 'audio' AND device_id = ? AND recorded_at IS NOT NULL \
             ORDER BY recorded_at DESC, path ASC"
        ))
        .bind(device_id)
        .fetch_all(&mut conn)
        .await?;

        if records.is_empty() {
            return Err(QueryError::EmptyResult);
        }
        Ok(records)
    }

    /// The `limit` recordings closest to a target instant, for "what did this
    /// site sound like around dawn" style browsing.
    pub async fn closest_recordings(
        &self,
        device_id: &str,
        target: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ObjectRecord>, QueryError> {
        let mut conn = self.store.connect().await?;

        let records: Vec<ObjectRecord> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM objects \
             WHERE kind = 'audio' AND device_id = ? AND recorded_at IS NOT NULL \
             ORDER BY ABS(CAST(strftime('%s', recorded_at) AS INTEGER) - ?) ASC \
             LIMIT ?"
        ))
        .bind(device_id)
        .bind(target.timestamp())
        .bind(limit)
        .fetch_all(&mut conn)
        .await?;

        if records.is_empty() {
            return Err(QueryError::EmptyResult);
        }
        Ok(records)
    }

    /// Active site metadata rows, for the site table.
    pub async fn sites(&self) -> Result<Vec<Site>, QueryError> {
        let mut conn = self.store.connect().await?;

        let sites = sqlx::query_as(
            "SELECT device_id, site_name, cluster, country, latitude, longitude, active, notes \
             FROM sites WHERE active = 1 ORDER BY site_name ASC",
        )
        .fetch_all(&mut conn)
        .await?;

        Ok(sites)
    }

    /// Site photographs for one device, with picture type parsed from the
    /// file name and a dashboard-relative media URL.
    pub async fn site_images(&self, device_id: &str) -> Result<Vec<SiteImage>, QueryError> {
        let mut conn = self.store.connect().await?;

        let records: Vec<ObjectRecord> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM objects \
             WHERE kind = 'image' AND device_id = ? \
             ORDER BY path ASC"
        ))
        .bind(device_id)
        .fetch_all(&mut conn)
        .await?;

        let images = records
            .into_iter()
            .map(|record| SiteImage {
                url: format!("/media/{}", record.path),
                picture_type: parse_image_name(&record.name).map(|(_, kind)| kind),
                device_id: record.device_id.unwrap_or_default(),
                path: record.path,
            })
            .collect();

        Ok(images)
    }
}

/// Append the WHERE predicates for every set filter field. Used by all
/// record and aggregate queries so filtering stays engine-side.
fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &FilterSpec) {
    if let Some(ref country) = filter.country {
        query.push(" AND country = ");
        query.push_bind(country.clone());
    }
    if let Some(ref device_id) = filter.device_id {
        query.push(" AND device_id = ");
        query.push_bind(device_id.clone());
    }
    if let Some(kind) = filter.kind {
        query.push(" AND kind = ");
        query.push_bind(kind);
    }
    if let Some(from) = filter.from {
        query.push(" AND recorded_at >= ");
        query.push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND recorded_at <= ");
        query.push_bind(to);
    }
}
