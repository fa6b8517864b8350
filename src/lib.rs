//! device-dashboard - deployment-metadata dashboard for a distributed
//! acoustic monitoring network
//!
//! This crate serves device status, recording inventories, and site metadata
//! from a precomputed object-storage index:
//! - Swappable object storage backends (local filesystem, GCS)
//! - A SQLite metadata index, rebuilt out-of-band by `build-index` and
//!   swapped in atomically
//! - A read-only query layer pushing all filtering and aggregation into SQL
//! - A JSON API for the map, audio-browser, and site views, behind an
//!   external authenticating proxy

pub mod api;
pub mod config;
pub mod index;
pub mod object_store;
pub mod query;

use std::sync::Arc;

use config::Config;
use query::QueryService;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub query: QueryService,
    pub object_store: Arc<dyn object_store::ObjectStore>,
}
