// src/publish.rs
//! GeoJSON export of the persisted state.
//!
//! Output coordinates are `[longitude, latitude]` with depth carried as a
//! sibling `geometry.depth` field, unlike the three-element coordinates the
//! feeds deliver.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::atomic_file::write_atomic;
use crate::error::PublishError;
use crate::ingest::merge::MERGED_TITLE;
use crate::store::{EarthquakeStore, PersistedEarthquake};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub metadata: GeoMetadata,
    pub features: Vec<GeoFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoMetadata {
    pub title: String,
    pub count: usize,
    /// Epoch milliseconds.
    pub generated: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub geometry: PointGeometry,
    pub properties: GeoProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoProperties {
    pub title: String,
    pub place: String,
    pub magnitude: Option<f64>,
    pub magnitude_type: String,
    pub utc_time: String,
}

impl From<&PersistedEarthquake> for GeoFeature {
    fn from(q: &PersistedEarthquake) -> Self {
        Self {
            kind: "Feature".to_string(),
            id: q.id.clone(),
            geometry: PointGeometry {
                kind: "Point".to_string(),
                coordinates: [q.longitude, q.latitude],
                depth: q.depth,
            },
            properties: GeoProperties {
                title: q.title.clone(),
                place: q.place.clone(),
                magnitude: q.magnitude,
                magnitude_type: q.magnitude_type.clone(),
                utc_time: q.utc_time.clone(),
            },
        }
    }
}

pub fn to_geojson(quakes: &[PersistedEarthquake]) -> GeoFeatureCollection {
    let features: Vec<GeoFeature> = quakes.iter().map(GeoFeature::from).collect();
    GeoFeatureCollection {
        kind: "FeatureCollection".to_string(),
        metadata: GeoMetadata {
            title: MERGED_TITLE.to_string(),
            count: features.len(),
            generated: chrono::Utc::now().timestamp_millis(),
        },
        features,
    }
}

/// Read every persisted record and map it to a GeoJSON feature.
pub async fn publish(store: &dyn EarthquakeStore) -> Result<GeoFeatureCollection, PublishError> {
    let quakes = store.scan_all().await?;
    Ok(to_geojson(&quakes))
}

/// Publish and atomically write the pretty-printed result to `dest`.
pub async fn publish_to_file(
    store: &dyn EarthquakeStore,
    dest: &Path,
) -> Result<GeoFeatureCollection, PublishError> {
    let collection = publish(store).await?;
    let bytes = serde_json::to_vec_pretty(&collection)?;
    write_atomic(dest, &bytes).await?;
    tracing::info!(path = %dest.display(), count = collection.metadata.count, "geojson export written");
    Ok(collection)
}
