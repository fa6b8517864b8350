//! Out-of-band index rebuild. Operator-triggered; the dashboard process
//! never runs this.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use device_dashboard::{
    config::{Config, StorageBackend},
    index::IndexBuilder,
    object_store as obj,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "build-index starting");

    let config = Config::load()?;

    let object_store: Arc<dyn obj::ObjectStore> = match config.storage.backend {
        StorageBackend::Local => {
            let store = obj::LocalStore::new(&config.storage.local_data_path)?;
            info!(
                "Listing local storage at: {}",
                config.storage.local_data_path
            );
            Arc::new(store)
        }
        StorageBackend::Gcs => {
            let bucket = config
                .storage
                .gcs_bucket
                .as_deref()
                .expect("GCS_BUCKET validated in config");
            let store =
                obj::GcsStore::new(bucket, config.storage.gcs_credentials_file.as_deref()).await?;
            info!("Listing GCS bucket: {}", bucket);
            Arc::new(store)
        }
    };

    let builder = IndexBuilder::new(object_store.as_ref());
    let summary = builder
        .build(
            Path::new(&config.data.site_metadata_path),
            Path::new(&config.data.index_path),
        )
        .await?;

    info!(
        objects = summary.objects,
        audio_files = summary.audio_files,
        sites = summary.sites,
        "Index rebuild complete"
    );
    Ok(())
}
