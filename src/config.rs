use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
}

#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Path to the metadata index file produced by build-index.
    pub index_path: String,
    /// Path to the site-metadata JSON file (consumed by build-index only).
    pub site_metadata_path: String,
    /// Recordings older than this are excluded from activity views.
    pub start_date: chrono::NaiveDate,
    /// Days without a recording before a device counts as offline.
    pub offline_threshold_days: i64,
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory mirroring the bucket layout for the local backend
    pub local_data_path: String,
    /// GCS bucket name (required when backend is gcs)
    pub gcs_bucket: Option<String>,
    /// Path to GCS service account JSON (optional, defaults to ADC)
    pub gcs_credentials_file: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_data_path: "./data".to_string(),
            gcs_bucket: None,
            gcs_credentials_file: None,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            index_path: "./assets/index.db".to_string(),
            site_metadata_path: "./assets/site_info.json".to_string(),
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
            offline_threshold_days: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let defaults = DataConfig::default();

        let index_path = std::env::var("INDEX_PATH").unwrap_or(defaults.index_path);
        let site_metadata_path =
            std::env::var("SITE_METADATA_PATH").unwrap_or(defaults.site_metadata_path);

        let start_date = match std::env::var("DATA_START_DATE") {
            Ok(raw) => raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "DATA_START_DATE must be YYYY-MM-DD, got '{raw}'"
                ))
            })?,
            Err(_) => defaults.start_date,
        };

        let offline_threshold_days = std::env::var("OFFLINE_THRESHOLD_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.offline_threshold_days);

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "gcs" => StorageBackend::Gcs,
            _ => StorageBackend::Local,
        };

        let local_data_path =
            std::env::var("LOCAL_DATA_PATH").unwrap_or_else(|_| "./data".to_string());

        let gcs_bucket = std::env::var("GCS_BUCKET").ok();
        let gcs_credentials_file = std::env::var("GCS_CREDENTIALS_FILE").ok();

        let config = Config {
            server: ServerConfig { bind_address },
            data: DataConfig {
                index_path,
                site_metadata_path,
                start_date,
                offline_threshold_days,
            },
            storage: StorageConfig {
                backend: storage_backend,
                local_data_path,
                gcs_bucket,
                gcs_credentials_file,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.data.index_path.is_empty() {
            return Err(ConfigError::ValidationError(
                "INDEX_PATH cannot be empty".to_string(),
            ));
        }

        if self.data.offline_threshold_days <= 0 {
            return Err(ConfigError::ValidationError(
                "OFFLINE_THRESHOLD_DAYS must be positive".to_string(),
            ));
        }

        if matches!(self.storage.backend, StorageBackend::Gcs) && self.storage.gcs_bucket.is_none()
        {
            return Err(ConfigError::ValidationError(
                "GCS_BUCKET is required when STORAGE_BACKEND=gcs".to_string(),
            ));
        }

        Ok(())
    }
}
