use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use super::{ObjectEntry, ObjectStore, ObjectStoreError};

/// Local filesystem backend mirroring the bucket layout, for development
/// and testing. Object paths map directly onto paths under `base_path`.
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    fn object_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn get(&self, path: &str) -> Result<Bytes, ObjectStoreError> {
        let full = self.object_path(path);
        if !full.is_file() {
            return Err(ObjectStoreError::NotFound(path.to_string()));
        }
        let data = tokio::fs::read(&full).await?;
        Ok(Bytes::from(data))
    }

    async fn exists(&self, path: &str) -> Result<bool, ObjectStoreError> {
        Ok(self.object_path(path).is_file())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, ObjectStoreError> {
        let root = self.base_path.clone();
        let start = if prefix.is_empty() {
            root.clone()
        } else {
            root.join(prefix)
        };

        // The walk is synchronous filesystem work; hand it to the blocking pool.
        let entries = tokio::task::spawn_blocking(move || walk(&root, &start))
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))??;

        Ok(entries)
    }
}

fn walk(root: &Path, dir: &Path) -> Result<Vec<ObjectEntry>, ObjectStoreError> {
    let mut out = Vec::new();
    if !dir.exists() {
        return Ok(out);
    }

    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            let meta = entry.metadata()?;
            if meta.is_dir() {
                stack.push(path);
                continue;
            }

            let rel = path
                .strip_prefix(root)
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
            let rel = rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");

            let modified_at: DateTime<Utc> = meta.modified()?.into();
            let mime_type = mime_guess::from_path(&path)
                .first()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());

            out.push(ObjectEntry {
                path: rel,
                size: meta.len(),
                modified_at,
                etag: None,
                mime_type,
            });
        }
    }

    // Stable output regardless of directory iteration order
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}
