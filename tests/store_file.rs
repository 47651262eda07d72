// tests/store_file.rs
use quakes_near_me::store::{EarthquakeStore, JsonFileStore, PersistedEarthquake, UpsertCounts};

fn quake(id: &str, mag: Option<f64>) -> PersistedEarthquake {
    PersistedEarthquake {
        id: id.into(),
        source: id.split(':').next().unwrap_or_default().into(),
        magnitude: mag,
        magnitude_type: "ml".into(),
        latitude: 45.2,
        longitude: 10.5,
        depth: 3.0,
        place: "NORTHERN ITALY".into(),
        origin_time: 1_705_314_151_120,
        utc_time: "2024-01-15 10:22:31".into(),
        title: "M 2.0 - NORTHERN ITALY".into(),
        event_type: "earthquake".into(),
    }
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("earthquakes.json");

    let store = JsonFileStore::open(&path).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
    let counts = store
        .upsert_batch(vec![quake("emsc:1", Some(2.0)), quake("usgs:2", None)])
        .await
        .unwrap();
    assert_eq!(counts, UpsertCounts { inserted: 2, updated: 0 });
    drop(store);

    let reopened = JsonFileStore::open(&path).await.unwrap();
    let all = reopened.scan_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].magnitude, None);
}

#[tokio::test]
async fn upsert_overwrites_and_delete_all_clears() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("q.json")).await.unwrap();

    store.upsert(quake("emsc:1", Some(2.0))).await.unwrap();
    let c = store.upsert(quake("emsc:1", Some(2.4))).await.unwrap();
    assert_eq!(c, UpsertCounts { inserted: 0, updated: 1 });
    assert_eq!(store.scan_all().await.unwrap()[0].magnitude, Some(2.4));

    assert_eq!(store.delete_all().await.unwrap(), 1);
    assert_eq!(store.count().await.unwrap(), 0);
    let reopened = JsonFileStore::open(store.path()).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_write_leaves_previous_state_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q.json");
    let store = JsonFileStore::open(&path).await.unwrap();
    store.upsert(quake("emsc:1", Some(2.0))).await.unwrap();
    let on_disk = std::fs::read(&path).unwrap();

    // A directory squatting on the temp path makes the write fail.
    std::fs::create_dir(dir.path().join("q.json.tmp")).unwrap();

    let err = store
        .replace_all(vec![quake("usgs:9", Some(5.0))])
        .await;
    assert!(err.is_err());

    let ids: Vec<_> = store.scan_all().await.unwrap().into_iter().map(|q| q.id).collect();
    assert_eq!(ids, vec!["emsc:1".to_string()]);
    assert_eq!(std::fs::read(&path).unwrap(), on_disk);
}

#[tokio::test]
async fn corrupt_file_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q.json");
    std::fs::write(&path, b"{not json").unwrap();
    assert!(JsonFileStore::open(&path).await.is_err());
}
