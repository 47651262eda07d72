// src/ingest/providers/emsc.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::feeds::FeedConfig;
use crate::error::{FetchError, NormalizationError};
use crate::ingest::http::{build_client, build_url, get_body, json_payload};
use crate::ingest::normalize::{collect_records, geojson, place_or_default, RecordParts};
use crate::ingest::types::{EventRecord, Normalized, RawPayload, SourceAdapter, TimeWindow};

pub const SOURCE_ID: &str = "emsc";
pub const TITLE: &str = "EMSC Earthquakes";
const DEFAULT_PLACE: &str = "EMSC region";

/// EMSC seismicportal FDSN endpoint (`format=json` returns GeoJSON).
///
/// Depth arrives as a negative third coordinate.
pub struct EmscAdapter {
    base_url: String,
    limit: u32,
    timeout: Duration,
    client: Client,
}

impl EmscAdapter {
    pub fn new(cfg: &FeedConfig) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: cfg.base_url.clone(),
            limit: cfg.limit,
            timeout: cfg.timeout(),
            client: build_client(cfg.timeout())?,
        })
    }

    fn request_url(&self, window: &TimeWindow) -> Result<reqwest::Url, FetchError> {
        let (start, end) = window.fdsn_bounds();
        build_url(
            &self.base_url,
            &[
                ("format", "json".to_string()),
                ("start", start),
                ("end", end),
                ("limit", self.limit.to_string()),
                ("orderby", "time".to_string()),
            ],
        )
    }
}

fn normalize_feature(f: &Value) -> Result<EventRecord, NormalizationError> {
    let raw_id = geojson::feature_id(f)
        .or_else(|| geojson::prop_str(f, "unid").map(str::to_string))
        .ok_or(NormalizationError::MissingField("id"))?;
    let (lon, lat, z) = geojson::coordinates(f)?;
    let origin_time = geojson::iso_time_prop(f, "time")?;

    RecordParts {
        source: SOURCE_ID,
        raw_id: &raw_id,
        magnitude: geojson::prop_f64(f, "mag"),
        magnitude_type: geojson::prop_str(f, "magtype"),
        longitude: lon,
        latitude: lat,
        z,
        place: place_or_default(geojson::prop_str(f, "flynn_region"), DEFAULT_PLACE),
        origin_time,
        // EMSC carries no title; always synthesized
        title: None,
        event_type: geojson::prop_str(f, "evtype"),
    }
    .into_record()
}

pub fn normalize(raw: &RawPayload) -> Normalized {
    match raw {
        RawPayload::Json(v) => collect_records(TITLE, geojson::features(v).iter().map(normalize_feature)),
        _ => collect_records(TITLE, Vec::new()),
    }
}

#[async_trait]
impl SourceAdapter for EmscAdapter {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, window: &TimeWindow) -> Result<RawPayload, FetchError> {
        let url = self.request_url(window)?;
        tracing::debug!(source = SOURCE_ID, %url, "fetching");
        let body = get_body(&self.client, url, self.timeout, &[StatusCode::NO_CONTENT]).await?;
        json_payload(body)
    }

    fn normalize(&self, raw: RawPayload) -> Normalized {
        normalize(&raw)
    }
}
