mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// One object surfaced by a recursive listing. Paths are bucket-relative,
/// `/`-separated, and never begin with a slash.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub path: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    pub etag: Option<String>,
    pub mime_type: String,
}

/// Abstraction over object storage backends.
/// The dashboard only reads: `list` feeds the index builder, `get` serves media.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Bytes, ObjectStoreError>;
    async fn exists(&self, path: &str) -> Result<bool, ObjectStoreError>;
    /// Recursively list every object under `prefix` (empty prefix = whole bucket).
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, ObjectStoreError>;
}
