use chrono::{TimeZone, Utc};
use device_dashboard::index::{ContentKind, IndexBuilder, IndexStore};
use device_dashboard::object_store::LocalStore;
use device_dashboard::query::{
    DeviceState, FilterSpec, Granularity, QueryError, QueryService, StatusMetrics,
};

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

/// Seed a bucket, build an index from it, and return a query service over
/// the result plus the paths needed to rebuild.
async fn test_service(
    dir: &tempfile::TempDir,
) -> (QueryService, std::path::PathBuf, std::path::PathBuf) {
    let bucket = dir.path().join("bucket");
    seed_bucket(&bucket);
    let sites_path = write_site_metadata(dir.path());
    let index_path = dir.path().join("index.db");

    let store = LocalStore::new(&bucket).unwrap();
    IndexBuilder::new(&store)
        .build(&sites_path, &index_path)
        .await
        .unwrap();

    let index = IndexStore::open(&index_path).await.unwrap();
    (QueryService::new(index), bucket, sites_path)
}

#[tokio::test]
async fn test_empty_filter_returns_full_index() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let set = service.records(&FilterSpec::default()).await.unwrap();
    assert_eq!(set.records.len(), 5);
    assert_eq!(set.summary.count, 5);

    // Ordered by path ascending, stable
    let mut sorted = set.records.clone();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    let actual: Vec<&str> = set.records.iter().map(|r| r.path.as_str()).collect();
    let expected: Vec<&str> = sorted.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_filtered_records_satisfy_every_predicate() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let full = service.records(&FilterSpec::default()).await.unwrap();

    let filter = FilterSpec {
        country: Some("France".to_string()),
        kind: Some(ContentKind::Audio),
        ..Default::default()
    };
    let set = service.records(&filter).await.unwrap();

    assert!(set.records.len() <= full.records.len());
    for record in &set.records {
        assert_eq!(record.country, "France");
        assert_eq!(record.kind, ContentKind::Audio);
        assert!(full.records.iter().any(|r| r.path == record.path));
    }
}

#[tokio::test]
async fn test_aggregate_count_matches_sequence_length() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    for filter in [
        FilterSpec::default(),
        FilterSpec {
            kind: Some(ContentKind::Audio),
            ..Default::default()
        },
        FilterSpec {
            country: Some("Norway".to_string()),
            ..Default::default()
        },
    ] {
        let set = service.records(&filter).await.unwrap();
        assert_eq!(set.summary.count as usize, set.records.len());
        let total: i64 = set.records.iter().map(|r| r.size).sum();
        assert_eq!(set.summary.total_size_bytes, total);
    }
}

#[tokio::test]
async fn test_norwegian_audio_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let filter = FilterSpec {
        country: Some("Norway".to_string()),
        kind: Some(ContentKind::Audio),
        ..Default::default()
    };
    let set = service.records(&filter).await.unwrap();

    let paths: Vec<&str> = set.records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "proj_tabmon_NINA/bugg_RPiID-10000000f42d7a05/conf_20250115/2025-03-02T12_00_00.000Z.mp3",
            "proj_tabmon_NINA/bugg_RPiID-10000000f42d7a05/conf_20250115/2025-03-03T06_30_00Z.mp3",
        ]
    );
    for record in &set.records {
        assert_eq!(record.device_id.as_deref(), Some("f42d7a05"));
    }
}

#[tokio::test]
async fn test_date_range_filter() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let filter = FilterSpec {
        kind: Some(ContentKind::Audio),
        from: Some(Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap()),
        to: Some(Utc.with_ymd_and_hms(2025, 3, 3, 23, 59, 59).unwrap()),
        ..Default::default()
    };
    let set = service.records(&filter).await.unwrap();

    assert_eq!(set.records.len(), 1);
    assert_eq!(
        set.records[0].recorded_at,
        Some(Utc.with_ymd_and_hms(2025, 3, 3, 6, 30, 0).unwrap())
    );
}

#[tokio::test]
async fn test_no_match_is_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let filter = FilterSpec {
        device_id: Some("zzzzzzzz".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        service.records(&filter).await.unwrap_err(),
        QueryError::EmptyResult
    ));
}

#[tokio::test]
async fn test_device_with_zero_recordings() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    // Known site, never recorded anything
    assert!(matches!(
        service.recordings_for_device("99999999").await.unwrap_err(),
        QueryError::EmptyResult
    ));
}

#[tokio::test]
async fn test_recordings_for_device_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let recordings = service.recordings_for_device("f42d7a05").await.unwrap();
    assert_eq!(recordings.len(), 2);
    assert!(recordings[0].recorded_at > recordings[1].recorded_at);
}

#[tokio::test]
async fn test_closest_recordings() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let target = Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap();
    let closest = service
        .closest_recordings("f42d7a05", target, 1)
        .await
        .unwrap();

    // 06:30 the same day beats noon the day before
    assert_eq!(closest.len(), 1);
    assert_eq!(
        closest[0].recorded_at,
        Some(Utc.with_ymd_and_hms(2025, 3, 3, 6, 30, 0).unwrap())
    );
}

#[tokio::test]
async fn test_dataset_stats() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let stats = service.dataset_stats(&FilterSpec::default()).await.unwrap();
    assert_eq!(stats.total_recordings, 3);
    assert_eq!(stats.total_size_bytes, 8 + 4 + 2);

    // Nothing matching still yields zeroed aggregates, not an error
    let filter = FilterSpec {
        country: Some("Spain".to_string()),
        ..Default::default()
    };
    let stats = service.dataset_stats(&filter).await.unwrap();
    assert_eq!(stats.total_recordings, 0);
    assert_eq!(stats.total_size_bytes, 0);
}

#[tokio::test]
async fn test_device_stats_busiest_first() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let stats = service.device_stats().await.unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].device_id, "f42d7a05");
    assert_eq!(stats[0].total_recordings, 2);
    assert_eq!(stats[1].device_id, "aabbccdd");
    assert_eq!(stats[1].total_recordings, 1);
    assert!(stats[0].earliest_recording <= stats[0].latest_recording);
}

#[tokio::test]
async fn test_device_status_online_offline() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let now = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
    let statuses = service.device_status(now, 3).await.unwrap();

    // Inactive sites are excluded; active sites all present
    assert_eq!(statuses.len(), 3);

    let by_id = |id: &str| statuses.iter().find(|s| s.device_id == id).unwrap();

    // Recorded within the threshold
    assert_eq!(by_id("f42d7a05").status, DeviceState::Online);
    assert_eq!(by_id("f42d7a05").total_recordings, 2);
    assert_eq!(by_id("aabbccdd").status, DeviceState::Online);

    // Site with no recordings at all
    let silent = by_id("99999999");
    assert_eq!(silent.status, DeviceState::Offline);
    assert_eq!(silent.total_recordings, 0);
    assert!(silent.last_recording.is_none());

    // Far in the future everything is offline
    let later = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
    let statuses = service.device_status(later, 3).await.unwrap();
    assert!(statuses.iter().all(|s| s.status == DeviceState::Offline));

    let metrics = StatusMetrics::from_statuses(&statuses);
    assert_eq!(metrics.total_devices, 3);
    assert_eq!(metrics.online_devices, 0);
    assert_eq!(metrics.offline_devices, 3);
}

#[tokio::test]
async fn test_activity_day_buckets() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let buckets = service
        .activity(&FilterSpec::default(), Granularity::Day)
        .await
        .unwrap();

    assert_eq!(buckets.len(), 3);
    let find = |device: &str, day: &str| {
        buckets
            .iter()
            .find(|b| b.device_id == device && b.bucket == day)
            .map(|b| b.recordings)
    };
    assert_eq!(find("f42d7a05", "2025-03-02"), Some(1));
    assert_eq!(find("f42d7a05", "2025-03-03"), Some(1));
    assert_eq!(find("aabbccdd", "2025-03-04"), Some(1));
}

#[tokio::test]
async fn test_site_images() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let images = service.site_images("aabbccdd").await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].picture_type.as_deref(), Some("habitat"));
    assert_eq!(
        images[0].url,
        "/media/proj_tabmon_NINA_FR/bugg_RPiID-10000000aabbccdd/site_pic_aabbccdd_habitat.jpg"
    );
}

#[tokio::test]
async fn test_sites_lists_active_only() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _, _) = test_service(&dir).await;

    let sites = service.sites().await.unwrap();
    assert_eq!(sites.len(), 3);
    assert!(sites.iter().all(|s| s.active));
    // Ordered by site name
    let names: Vec<&str> = sites.iter().map(|s| s.site_name.as_str()).collect();
    assert_eq!(names, vec!["Birch Fen North", "Causse Mejean", "Sierra Quiet"]);
}

#[tokio::test]
async fn test_rebuild_staleness_contract() {
    let dir = tempfile::tempdir().unwrap();
    let (service, bucket, sites_path) = test_service(&dir).await;

    // A freshly uploaded object is invisible until the next rebuild
    seed_file(
        &bucket,
        "proj_tabmon_NINA/bugg_RPiID-10000000f42d7a05/conf_20250115/2025-03-05T09_00_00Z.mp3",
        b"new",
    );
    let before = service.records(&FilterSpec::default()).await.unwrap();
    assert_eq!(before.records.len(), 5);

    // Rebuild swaps a new index file into place at the same path; the same
    // service sees it on its next query because connections are per-query.
    let store = LocalStore::new(&bucket).unwrap();
    IndexBuilder::new(&store)
        .build(&sites_path, service.store().path())
        .await
        .unwrap();

    let after = service.records(&FilterSpec::default()).await.unwrap();
    assert_eq!(after.records.len(), 6);
    assert!(after
        .records
        .iter()
        .any(|r| r.path.ends_with("2025-03-05T09_00_00Z.mp3")));
}
