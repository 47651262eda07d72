// src/ingest/providers/sed.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::feeds::FeedConfig;
use crate::error::{FetchError, NormalizationError};
use crate::ingest::http::{build_client, build_url, get_body, json_payload};
use crate::ingest::normalize::{collect_records, geojson, place_or_default, RecordParts};
use crate::ingest::types::{EventRecord, Normalized, RawPayload, SourceAdapter, TimeWindow};

pub const SOURCE_ID: &str = "sed";
pub const TITLE: &str = "SED Earthquakes";
const DEFAULT_PLACE: &str = "SED region";

/// Swiss Seismological Service FDSN endpoint.
///
/// Requests `nodata=404`, so an empty window answers 404 rather than 204.
pub struct SedAdapter {
    base_url: String,
    limit: u32,
    timeout: Duration,
    client: Client,
}

impl SedAdapter {
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
                ("format", "geojson".to_string()),
                ("starttime", start),
                ("endtime", end),
                ("limit", self.limit.to_string()),
                ("nodata", "404".to_string()),
            ],
        )
    }
}

fn normalize_feature(f: &Value) -> Result<EventRecord, NormalizationError> {
    let raw_id = geojson::feature_id(f).ok_or(NormalizationError::MissingField("id"))?;
    let (lon, lat, z) = geojson::coordinates(f)?;
    let origin_time = geojson::iso_time_prop(f, "time")?;
    let place = geojson::prop_str(f, "place").or_else(|| geojson::prop_str(f, "region"));

    RecordParts {
        source: SOURCE_ID,
        raw_id: &raw_id,
        magnitude: geojson::prop_f64(f, "mag"),
        magnitude_type: geojson::prop_str(f, "magType"),
        longitude: lon,
        latitude: lat,
        z,
        place: place_or_default(place, DEFAULT_PLACE),
        origin_time,
        title: geojson::prop_str(f, "title"),
        event_type: geojson::prop_str(f, "type"),
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
impl SourceAdapter for SedAdapter {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, window: &TimeWindow) -> Result<RawPayload, FetchError> {
        let url = self.request_url(window)?;
        tracing::debug!(source = SOURCE_ID, %url, "fetching");
        let body = get_body(&self.client, url, self.timeout, &[StatusCode::NOT_FOUND]).await?;
        json_payload(body)
    }

    fn normalize(&self, raw: RawPayload) -> Normalized {
        normalize(&raw)
    }
}
