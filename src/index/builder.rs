use std::path::Path;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use thiserror::Error;
use tracing::{debug, info};

use super::model::{ContentKind, ObjectRecord, Site};
use crate::object_store::{ObjectStore, ObjectStoreError};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Listing error: {0}")]
    Listing(#[from] ObjectStoreError),
    #[error("Site metadata error: {0}")]
    SiteMetadata(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default)]
pub struct BuildSummary {
    pub objects: u64,
    pub audio_files: u64,
    pub sites: u64,
}

const SCHEMA: &str = "
CREATE TABLE objects (
    path        TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    size        INTEGER NOT NULL,
    modified_at TEXT NOT NULL,
    etag        TEXT,
    mime_type   TEXT NOT NULL,
    kind        TEXT NOT NULL,
    project     TEXT NOT NULL,
    country     TEXT NOT NULL,
    device_dir  TEXT,
    device_id   TEXT,
    recorded_at TEXT
);
CREATE INDEX idx_objects_kind ON objects (kind);
CREATE INDEX idx_objects_device ON objects (device_id);
CREATE INDEX idx_objects_recorded ON objects (recorded_at);
CREATE TABLE sites (
    device_id TEXT PRIMARY KEY,
    site_name TEXT NOT NULL,
    cluster   TEXT,
    country   TEXT NOT NULL,
    latitude  REAL,
    longitude REAL,
    active    INTEGER NOT NULL,
    notes     TEXT
);
";

/// Builds the metadata index from a recursive object-storage listing and the
/// site-metadata file. Runs out-of-band, operator-triggered; the serving
/// process only ever reads the result.
pub struct IndexBuilder<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// List every object, parse identity out of each path, join the site
    /// metadata, and write a fresh index file. The new file is staged as
    /// `.tmp-<uuid>` next to the target and renamed over it, so readers
    /// never observe a partial index.
    pub async fn build(
        &self,
        site_metadata_path: &Path,
        output: &Path,
    ) -> Result<BuildSummary, BuildError> {
        let entries = self.store.list("").await?;
        info!(objects = entries.len(), "Listed bucket");

        let records: Vec<ObjectRecord> = entries.iter().map(ObjectRecord::from_entry).collect();
        let sites = load_sites(site_metadata_path).await?;

        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", uuid::Uuid::new_v4()));

        let summary = match self.write_index(&tmp_path, &records, &sites).await {
            Ok(summary) => summary,
            Err(err) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(err);
            }
        };

        if let Err(err) = tokio::fs::rename(&tmp_path, output).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(BuildError::Io(err));
        }

        info!(
            objects = summary.objects,
            audio_files = summary.audio_files,
            sites = summary.sites,
            path = %output.display(),
            "Index rebuilt"
        );
        Ok(summary)
    }

    async fn write_index(
        &self,
        path: &Path,
        records: &[ObjectRecord],
        sites: &[Site],
    ) -> Result<BuildSummary, BuildError> {
        let mut conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&mut conn).await?;

        let mut summary = BuildSummary::default();
        let mut tx = conn.begin().await?;

        for record in records {
            sqlx::query(
                "INSERT INTO objects (path, name, size, modified_at, etag, mime_type, kind, \
                 project, country, device_dir, device_id, recorded_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.path)
            .bind(&record.name)
            .bind(record.size)
            .bind(record.modified_at)
            .bind(&record.etag)
            .bind(&record.mime_type)
            .bind(record.kind)
            .bind(&record.project)
            .bind(&record.country)
            .bind(&record.device_dir)
            .bind(&record.device_id)
            .bind(record.recorded_at)
            .execute(&mut *tx)
            .await?;

            summary.objects += 1;
            if record.kind == ContentKind::Audio {
                summary.audio_files += 1;
            }
        }

        for site in sites {
            sqlx::query(
                "INSERT INTO sites (device_id, site_name, cluster, country, latitude, \
                 longitude, active, notes) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&site.device_id)
            .bind(&site.site_name)
            .bind(&site.cluster)
            .bind(&site.country)
            .bind(site.latitude)
            .bind(site.longitude)
            .bind(site.active)
            .bind(&site.notes)
            .execute(&mut *tx)
            .await?;

            summary.sites += 1;
        }

        tx.commit().await?;
        conn.close().await?;

        debug!(path = %path.display(), "Staged index written");
        Ok(summary)
    }
}

async fn load_sites(path: &Path) -> Result<Vec<Site>, BuildError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        BuildError::SiteMetadata(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| BuildError::SiteMetadata(format!("cannot parse {}: {e}", path.display())))
}
