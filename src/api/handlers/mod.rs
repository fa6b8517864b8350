mod admin;
mod devices;
mod media;
mod recordings;
mod sites;

use crate::api::response::ApiError;
use crate::query::QueryError;

pub use admin::health;
pub use devices::{device_recordings, device_stats, device_status};
pub use media::serve_media;
pub use recordings::{activity, dataset_stats, list_recordings};
pub use sites::{list_sites, site_images};

/// Map a QueryError to an ApiError. Queries that can legitimately come
/// back empty go through `empty_ok` instead.
fn query_error(e: QueryError) -> ApiError {
    match e {
        QueryError::EmptyResult => ApiError::not_found("No matching records"),
        other => ApiError::internal(other.to_string()),
    }
}

/// Unwrap a record-listing result, mapping `EmptyResult` to an empty
/// sequence. Queries returning nothing are an empty-state, not a failure.
fn empty_ok<T>(result: Result<Vec<T>, QueryError>) -> Result<Vec<T>, ApiError> {
    match result {
        Ok(items) => Ok(items),
        Err(QueryError::EmptyResult) => Ok(Vec::new()),
        Err(other) => Err(query_error(other)),
    }
}
