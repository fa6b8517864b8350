use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object_store::ObjectEntry;

/// Classification of an indexed object derived from its MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContentKind {
    Audio,
    Image,
    Metadata,
    Other,
}

impl ContentKind {
    /// Derive a content kind from a MIME type string.
    pub fn from_mime(mime_type: &str) -> Self {
        let mut parts = mime_type.split('/');
        let primary = parts.next().unwrap_or("");
        let sub = parts.next().unwrap_or("");
        match primary {
            "audio" => ContentKind::Audio,
            "image" => ContentKind::Image,
            "text" => ContentKind::Metadata,
            "application" => match sub {
                "json" | "csv" | "x-yaml" => ContentKind::Metadata,
                _ => ContentKind::Other,
            },
            _ => ContentKind::Other,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(ContentKind::Audio),
            "image" => Some(ContentKind::Image),
            "metadata" => Some(ContentKind::Metadata),
            "other" => Some(ContentKind::Other),
            _ => None,
        }
    }
}

/// One object's metadata entry in the bucket index. Regenerated wholesale on
/// every rebuild; never mutated by the serving process.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ObjectRecord {
    /// Bucket-relative object path
    pub path: String,
    /// Final path segment
    pub name: String,
    pub size: i64,
    pub modified_at: DateTime<Utc>,
    pub etag: Option<String>,
    pub mime_type: String,
    pub kind: ContentKind,
    /// Top-level project directory, e.g. `proj_tabmon_NINA_FR`
    pub project: String,
    /// Country the project directory maps to, `Unknown` if unmapped
    pub country: String,
    /// Device directory segment, e.g. `bugg_RPiID-10000000f42d7a05`
    pub device_dir: Option<String>,
    /// Short device id: last 8 chars of the serial suffix
    pub device_id: Option<String>,
    /// Recording timestamp parsed from the file name (audio only)
    pub recorded_at: Option<DateTime<Utc>>,
}

impl ObjectRecord {
    /// Build an index row from a raw listing entry, parsing device and site
    /// identity out of the path.
    pub fn from_entry(entry: &ObjectEntry) -> Self {
        let parts: Vec<&str> = entry.path.split('/').collect();
        let name = parts.last().copied().unwrap_or(&entry.path).to_string();

        let (project, device_dir) = if parts.len() >= 2 {
            (parts[0].to_string(), Some(parts[1].to_string()))
        } else {
            (String::new(), None)
        };

        let kind = ContentKind::from_mime(&entry.mime_type);

        // Images name their device in the file name, everything else in the path.
        let device_id = match kind {
            ContentKind::Image => parse_image_name(&name)
                .map(|(id, _)| id)
                .or_else(|| device_dir.as_deref().map(short_device_id)),
            _ => device_dir.as_deref().map(short_device_id),
        };

        let recorded_at = if kind == ContentKind::Audio {
            parse_recording_timestamp(&name)
        } else {
            None
        };

        ObjectRecord {
            path: entry.path.clone(),
            name,
            size: entry.size as i64,
            modified_at: entry.modified_at,
            etag: entry.etag.clone(),
            mime_type: entry.mime_type.clone(),
            kind,
            country: country_for_project(&project).to_string(),
            project,
            device_dir,
            device_id,
            recorded_at,
        }
    }
}

/// Site metadata row, joined to devices by short device id.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Site {
    pub device_id: String,
    pub site_name: String,
    #[serde(default)]
    pub cluster: Option<String>,
    pub country: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub active: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Map a top-level project directory to its deployment country.
pub fn country_for_project(project: &str) -> &'static str {
    match project {
        "proj_tabmon_NINA" => "Norway",
        "proj_tabmon_NINA_ES" => "Spain",
        "proj_tabmon_NINA_NL" => "Netherlands",
        "proj_tabmon_NINA_FR" => "France",
        _ => "Unknown",
    }
}

/// Short device id: the last 8 characters of the segment after the final `-`
/// in the device directory (`bugg_RPiID-10000000f42d7a05` -> `f42d7a05`).
pub fn short_device_id(device_dir: &str) -> String {
    let serial = device_dir.rsplit('-').next().unwrap_or(device_dir).trim();
    let tail_start = serial
        .char_indices()
        .rev()
        .nth(7)
        .map(|(i, _)| i)
        .unwrap_or(0);
    serial[tail_start..].to_string()
}

/// Parse a recording timestamp out of an audio file name. Recorders have
/// shipped three shapes over time; all are UTC.
pub fn parse_recording_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_suffix(".mp3")?;
    const FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H_%M_%S%.3fZ",
        "%Y-%m-%dT%H_%M_%SZ",
        "%Y-%m-%dT%H_%MZ",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(stem, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Split a site image name (`site_pic_<deviceid>_<type>.jpg`) into its
/// device id and picture type.
pub fn parse_image_name(name: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = name.split('_').collect();
    if parts.len() < 4 {
        return None;
    }
    let device_id = parts[2].to_string();
    let picture_type = parts[3].split('.').next().unwrap_or("").to_string();
    if device_id.is_empty() || picture_type.is_empty() {
        return None;
    }
    Some((device_id, picture_type))
}
