use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::ConnectOptions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index file not found: {0}")]
    NotFound(String),
    #[error("Index file is malformed: {0}")]
    Malformed(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Handle on the metadata index file.
///
/// The serving process never writes the index; each query opens a fresh
/// read-only connection against the configured path. An out-of-band rebuild
/// that renames a new file into place is therefore picked up by the next
/// query without coordination.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    /// Open the index at the given path, verifying it exists and carries the
    /// expected schema. A missing or malformed file is fatal for the
    /// dashboard, so this runs at startup.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(IndexError::NotFound(path.display().to_string()));
        }

        let store = Self { path };
        store.verify_schema().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh read-only connection to the index file.
    pub async fn connect(&self) -> Result<SqliteConnection, IndexError> {
        let conn = SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true)
            .connect()
            .await?;
        Ok(conn)
    }

    async fn verify_schema(&self) -> Result<(), IndexError> {
        let mut conn = self.connect().await?;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('objects', 'sites')",
        )
        .fetch_all(&mut conn)
        .await
        .map_err(|e| IndexError::Malformed(e.to_string()))?;

        for required in ["objects", "sites"] {
            if !tables.iter().any(|(name,)| name == required) {
                return Err(IndexError::Malformed(format!(
                    "missing table '{required}' in {}",
                    self.path.display()
                )));
            }
        }

        Ok(())
    }
}
