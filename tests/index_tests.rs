use chrono::{TimeZone, Utc};
use device_dashboard::index::{
    country_for_project, parse_image_name, parse_recording_timestamp, short_device_id,
    ContentKind, IndexBuilder, IndexError, IndexStore,
};
use device_dashboard::object_store::LocalStore;

// ============================================================================
// Path identity parsing
// ============================================================================

#[test]
fn test_country_for_project() {
    assert_eq!(country_for_project("proj_tabmon_NINA"), "Norway");
    assert_eq!(country_for_project("proj_tabmon_NINA_ES"), "Spain");
    assert_eq!(country_for_project("proj_tabmon_NINA_NL"), "Netherlands");
    assert_eq!(country_for_project("proj_tabmon_NINA_FR"), "France");
    assert_eq!(country_for_project("proj_other"), "Unknown");
    assert_eq!(country_for_project(""), "Unknown");
}

#[test]
fn test_short_device_id() {
    assert_eq!(short_device_id("bugg_RPiID-10000000f42d7a05"), "f42d7a05");
    // Already short serials pass through
    assert_eq!(short_device_id("bugg-f42d7a05"), "f42d7a05");
    // Shorter than 8 chars: keep everything after the final dash
    assert_eq!(short_device_id("bugg-abc"), "abc");
    // No dash at all: last 8 chars of the whole segment
    assert_eq!(short_device_id("10000000f42d7a05"), "f42d7a05");
}

#[test]
fn test_parse_recording_timestamp_formats() {
    let with_millis = parse_recording_timestamp("2025-03-02T12_30_15.500Z.mp3").unwrap();
    assert_eq!(
        with_millis,
        Utc.with_ymd_and_hms(2025, 3, 2, 12, 30, 15).unwrap()
            + chrono::Duration::milliseconds(500)
    );

    let with_seconds = parse_recording_timestamp("2025-03-02T12_30_15Z.mp3").unwrap();
    assert_eq!(
        with_seconds,
        Utc.with_ymd_and_hms(2025, 3, 2, 12, 30, 15).unwrap()
    );

    let minutes_only = parse_recording_timestamp("2025-03-02T12_30Z.mp3").unwrap();
    assert_eq!(
        minutes_only,
        Utc.with_ymd_and_hms(2025, 3, 2, 12, 30, 0).unwrap()
    );
}

#[test]
fn test_parse_recording_timestamp_rejects_other_names() {
    assert!(parse_recording_timestamp("config.json").is_none());
    assert!(parse_recording_timestamp("notes.mp3").is_none());
    assert!(parse_recording_timestamp("2025-03-02T12_30_15Z.wav").is_none());
}

#[test]
fn test_parse_image_name() {
    let (device_id, picture_type) = parse_image_name("site_pic_f42d7a05_habitat.jpg").unwrap();
    assert_eq!(device_id, "f42d7a05");
    assert_eq!(picture_type, "habitat");

    assert!(parse_image_name("photo.jpg").is_none());
    assert!(parse_image_name("site_pic_f42d7a05.jpg").is_none());
}

#[test]
fn test_content_kind_from_mime() {
    assert_eq!(ContentKind::from_mime("audio/mpeg"), ContentKind::Audio);
    assert_eq!(ContentKind::from_mime("image/jpeg"), ContentKind::Image);
    assert_eq!(ContentKind::from_mime("image/png"), ContentKind::Image);
    assert_eq!(ContentKind::from_mime("text/csv"), ContentKind::Metadata);
    assert_eq!(
        ContentKind::from_mime("application/json"),
        ContentKind::Metadata
    );
    assert_eq!(
        ContentKind::from_mime("application/octet-stream"),
        ContentKind::Other
    );
}

// ============================================================================
// Builder and store
// ============================================================================

fn seed_file(root: &std::path::Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn seed_bucket(root: &std::path::Path) {
    seed_file(
        root,
        "proj_tabmon_NINA/bugg_RPiID-10000000f42d7a05/conf_20250115/2025-03-02T12_00_00.000Z.mp3",
        b"aaaaaaaa",
    );
    seed_file(
        root,
        "proj_tabmon_NINA/bugg_RPiID-10000000f42d7a05/conf_20250115/2025-03-03T06_30_00Z.mp3",
        b"bbbb",
    );
    seed_file(
        root,
        "proj_tabmon_NINA_FR/bugg_RPiID-10000000aabbccdd/conf_20250201/2025-03-04T05_15Z.mp3",
        b"cc",
    );
    seed_file(
        root,
        "proj_tabmon_NINA_FR/bugg_RPiID-10000000aabbccdd/site_pic_aabbccdd_habitat.jpg",
        b"jpegjpeg",
    );
    seed_file(
        root,
        "proj_tabmon_NINA/bugg_RPiID-10000000f42d7a05/conf_20250115/config.json",
        b"{}",
    );
}

fn write_site_metadata(dir: &std::path::Path) -> std::path::PathBuf {
    let sites = serde_json::json!([
        {
            "device_id": "f42d7a05",
            "site_name": "Birch Fen North",
            "cluster": "Trondheim",
            "country": "Norway",
            "latitude": 63.43,
            "longitude": 10.39,
            "active": true
        },
        {
            "device_id": "aabbccdd",
            "site_name": "Causse Mejean",
            "country": "France",
            "latitude": 44.19,
            "longitude": 3.43,
            "active": true
        },
        {
            "device_id": "99999999",
            "site_name": "Sierra Quiet",
            "country": "Spain",
            "active": true
        },
        {
            "device_id": "00000000",
            "site_name": "Retired Plot",
            "country": "Norway",
            "active": false
        }
    ]);
    let path = dir.join("site_info.json");
    std::fs::write(&path, serde_json::to_string_pretty(&sites).unwrap()).unwrap();
    path
}

#[tokio::test]
async fn test_build_writes_queryable_index() {
    let dir = tempfile::tempdir().unwrap();
    let bucket = dir.path().join("bucket");
    seed_bucket(&bucket);
    let sites_path = write_site_metadata(dir.path());
    let index_path = dir.path().join("assets/index.db");

    let store = LocalStore::new(&bucket).unwrap();
    let summary = IndexBuilder::new(&store)
        .build(&sites_path, &index_path)
        .await
        .unwrap();

    assert_eq!(summary.objects, 5);
    assert_eq!(summary.audio_files, 3);
    assert_eq!(summary.sites, 4);

    // The result is openable and schema-complete
    let index = IndexStore::open(&index_path).await.unwrap();
    assert_eq!(index.path(), index_path.as_path());
}

#[tokio::test]
async fn test_build_leaves_no_staging_files() {
    let dir = tempfile::tempdir().unwrap();
    let bucket = dir.path().join("bucket");
    seed_bucket(&bucket);
    let sites_path = write_site_metadata(dir.path());
    let index_path = dir.path().join("index.db");

    let store = LocalStore::new(&bucket).unwrap();
    IndexBuilder::new(&store)
        .build(&sites_path, &index_path)
        .await
        .unwrap();

    let leftovers: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with(".tmp-"))
        .collect();
    assert!(leftovers.is_empty(), "staging files left behind: {leftovers:?}");
}

#[tokio::test]
async fn test_build_replaces_existing_index() {
    let dir = tempfile::tempdir().unwrap();
    let bucket = dir.path().join("bucket");
    seed_bucket(&bucket);
    let sites_path = write_site_metadata(dir.path());
    let index_path = dir.path().join("index.db");

    let store = LocalStore::new(&bucket).unwrap();
    let builder = IndexBuilder::new(&store);
    builder.build(&sites_path, &index_path).await.unwrap();
    // Second rebuild renames over the first without error
    let summary = builder.build(&sites_path, &index_path).await.unwrap();
    assert_eq!(summary.objects, 5);
}

#[tokio::test]
async fn test_build_fails_on_malformed_site_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let bucket = dir.path().join("bucket");
    seed_bucket(&bucket);
    let sites_path = dir.path().join("site_info.json");
    std::fs::write(&sites_path, b"not json at all").unwrap();
    let index_path = dir.path().join("index.db");

    let store = LocalStore::new(&bucket).unwrap();
    let result = IndexBuilder::new(&store).build(&sites_path, &index_path).await;
    assert!(result.is_err());
    assert!(!index_path.exists(), "failed build must not produce an index");
}

#[tokio::test]
async fn test_open_missing_index_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = IndexStore::open(dir.path().join("absent.db")).await;
    assert!(matches!(result.unwrap_err(), IndexError::NotFound(_)));
}

#[tokio::test]
async fn test_open_malformed_index_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.db");
    std::fs::write(&path, b"this is not a database").unwrap();

    let result = IndexStore::open(&path).await;
    assert!(result.is_err());
}
