// tests/providers_http.rs
//
// Feed adapters against a local mock server: success, no-content,
// error status and timeout handling per feed.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quakes_near_me::config::feeds::{FeedConfig, FeedKind};
use quakes_near_me::error::FetchError;
use quakes_near_me::ingest::providers::build_adapter;
use quakes_near_me::ingest::types::{RawPayload, SourceAdapter, TimeWindow};

const QUERY_PATH: &str = "/fdsnws/event/1/query";

fn cfg_for(kind: FeedKind, server: &MockServer) -> FeedConfig {
    let mut cfg = kind.defaults();
    cfg.base_url = format!("{}{QUERY_PATH}", server.uri());
    cfg.timeout_secs = 1;
    cfg
}

fn window() -> TimeWindow {
    let end = Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap();
    TimeWindow::ending_at(end, Duration::from_secs(24 * 3600))
}

#[tokio::test]
async fn usgs_fetch_and_normalize_fixture() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("format", "geojson"))
        .and(query_param("starttime", "2024-01-15T00:00:00"))
        .and(query_param("endtime", "2024-01-16T00:00:00"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(include_str!("fixtures/usgs.geojson")),
        )
        .mount(&server)
        .await;

    let adapter = build_adapter(FeedKind::Usgs, &cfg_for(FeedKind::Usgs, &server)).unwrap();
    let raw = adapter.fetch(&window()).await.expect("fetch ok");
    let out = adapter.normalize(raw);

    assert_eq!(out.collection.count(), 2);
    assert_eq!(out.rejected.len(), 1, "feature without latitude is dropped");

    let first = &out.collection.features()[0];
    assert_eq!(first.id, "usgs:us7000abcd");
    assert_eq!(first.origin_time, 1_705_314_151_120);
    assert_eq!(first.utc_time, "2024-01-15 10:22:31");
    assert_eq!(first.title, "M 3.4 - 10 km NW of The Geysers, CA");

    let second = &out.collection.features()[1];
    assert_eq!(second.depth, 1.2);
    assert_eq!(second.place, "USGS region");
    assert_eq!(second.title, "M 2.0 - USGS region");
}

#[tokio::test]
async fn emsc_uses_start_end_params_and_unid_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("format", "json"))
        .and(query_param("start", "2024-01-15T00:00:00"))
        .and(query_param("end", "2024-01-16T00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_string(include_str!("fixtures/emsc.json")))
        .mount(&server)
        .await;

    let adapter = build_adapter(FeedKind::Emsc, &cfg_for(FeedKind::Emsc, &server)).unwrap();
    let out = adapter.normalize(adapter.fetch(&window()).await.unwrap());

    let ids: Vec<_> = out.collection.features().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["emsc:20240115_0000101", "emsc:20240115_0000102"]);
    let r = &out.collection.features()[0];
    assert_eq!(r.depth, 3.0);
    assert_eq!(r.place, "NORTHERN ITALY");
    assert_eq!(r.magnitude_type, "ml");
    assert_eq!(r.title, "M 2.0 - NORTHERN ITALY");
}

#[tokio::test]
async fn knmi_text_rows_with_malformed_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("format", "text"))
        .respond_with(ResponseTemplate::new(200).set_body_string(include_str!("fixtures/knmi.txt")))
        .mount(&server)
        .await;

    let adapter = build_adapter(FeedKind::Knmi, &cfg_for(FeedKind::Knmi, &server)).unwrap();
    let raw = adapter.fetch(&window()).await.unwrap();
    assert!(matches!(raw, RawPayload::Text(_)));
    let out = adapter.normalize(raw);

    assert_eq!(out.collection.count(), 2);
    assert_eq!(out.rejected.len(), 1);
    let r = &out.collection.features()[0];
    assert_eq!(r.id, "knmi:knmi2024abcd");
    assert_eq!(r.place, "Garrelsweer");
    assert_eq!(r.event_type, "induced or triggered event");
    assert_eq!(out.collection.features()[1].depth, 0.0);
}

#[tokio::test]
async fn resif_description_language_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(include_str!("fixtures/resif.json")))
        .mount(&server)
        .await;

    let adapter = build_adapter(FeedKind::Resif, &cfg_for(FeedKind::Resif, &server)).unwrap();
    let out = adapter.normalize(adapter.fetch(&window()).await.unwrap());

    let places: Vec<_> = out.collection.features().iter().map(|r| r.place.as_str()).collect();
    assert_eq!(
        places,
        vec!["Earthquake of magnitude 2.3 near Gap", "Séisme près de Pau"]
    );
}

#[tokio::test]
async fn sed_requests_nodata_404_and_treats_404_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("nodata", "404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let adapter = build_adapter(FeedKind::Sed, &cfg_for(FeedKind::Sed, &server)).unwrap();
    let raw = adapter.fetch(&window()).await.expect("404 is no content for sed");
    assert_eq!(raw, RawPayload::Empty);
    assert!(adapter.normalize(raw).collection.is_empty());
}

#[tokio::test]
async fn no_content_204_is_an_empty_collection() {
    for kind in [FeedKind::Usgs, FeedKind::Emsc, FeedKind::Knmi, FeedKind::Resif] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(QUERY_PATH))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let adapter = build_adapter(kind, &cfg_for(kind, &server)).unwrap();
        let raw = adapter.fetch(&window()).await.unwrap();
        assert_eq!(raw, RawPayload::Empty, "{}", kind.id());
        let out = adapter.normalize(raw);
        assert_eq!(out.collection.count(), 0);
        assert!(out.rejected.is_empty());
    }
}

#[tokio::test]
async fn server_error_is_a_status_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let adapter = build_adapter(FeedKind::Usgs, &cfg_for(FeedKind::Usgs, &server)).unwrap();
    let err = adapter.fetch(&window()).await.unwrap_err();
    match &err {
        FetchError::Status { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(err.kind(), "fetch");
}

#[tokio::test]
async fn slow_feed_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(include_str!("fixtures/usgs.geojson"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let adapter = build_adapter(FeedKind::Usgs, &cfg_for(FeedKind::Usgs, &server)).unwrap();
    let err = adapter.fetch(&window()).await.unwrap_err();
    assert!(err.is_timeout(), "got {err:?}");
    assert_eq!(err.kind(), "timeout");
}

#[tokio::test]
async fn invalid_json_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let adapter = build_adapter(FeedKind::Emsc, &cfg_for(FeedKind::Emsc, &server)).unwrap();
    let err = adapter.fetch(&window()).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
}
