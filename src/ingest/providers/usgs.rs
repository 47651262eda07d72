// src/ingest/providers/usgs.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::feeds::FeedConfig;
use crate::error::{FetchError, NormalizationError};
use crate::ingest::http::{build_client, build_url, get_body, json_payload};
use crate::ingest::normalize::{collect_records, epoch_value_to_ms, geojson, place_or_default, RecordParts};
use crate::ingest::types::{Normalized, RawPayload, SourceAdapter, TimeWindow};

pub const SOURCE_ID: &str = "usgs";
pub const TITLE: &str = "USGS Earthquakes";
const DEFAULT_PLACE: &str = "USGS region";

/// USGS FDSN event service, GeoJSON flavour.
pub struct UsgsAdapter {
    base_url: String,
    limit: u32,
    timeout: Duration,
    client: Client,
}

impl UsgsAdapter {
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
                ("orderby", "time".to_string()),
            ],
        )
    }
}

/// Map one USGS feature. `properties.time` is already epoch milliseconds.
fn normalize_feature(f: &Value) -> Result<crate::ingest::types::EventRecord, NormalizationError> {
    let raw_id = geojson::feature_id(f).ok_or(NormalizationError::MissingField("id"))?;
    let (lon, lat, z) = geojson::coordinates(f)?;
    let time = geojson::prop(f, "time").ok_or(NormalizationError::MissingField("time"))?;
    let origin_time = epoch_value_to_ms(time).ok_or_else(|| NormalizationError::InvalidField {
        field: "time",
        value: time.to_string(),
    })?;

    RecordParts {
        source: SOURCE_ID,
        raw_id: &raw_id,
        magnitude: geojson::prop_f64(f, "mag"),
        magnitude_type: geojson::prop_str(f, "magType"),
        longitude: lon,
        latitude: lat,
        z,
        place: place_or_default(geojson::prop_str(f, "place"), DEFAULT_PLACE),
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
impl SourceAdapter for UsgsAdapter {
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
