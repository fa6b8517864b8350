mod builder;
mod model;
mod store;

pub use builder::{BuildError, BuildSummary, IndexBuilder};
pub use model::{
    country_for_project, parse_image_name, parse_recording_timestamp, short_device_id,
    ContentKind, ObjectRecord, Site,
};
pub use store::{IndexError, IndexStore};
