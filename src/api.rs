// src/api.rs
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::ingest::{CycleReport, Orchestrator};
use crate::publish::{publish, GeoFeature};
use crate::store::EarthquakeStore;

const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";
const MAX_PAGE: usize = 1000;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn EarthquakeStore>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let store = orchestrator.store();
        Self { orchestrator, store }
    }
}

pub fn router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/fetch_and_save", post(fetch_and_save))
        .route("/api/earthquakes.geojson", get(earthquakes_geojson))
        .route("/earthquakes", get(list_earthquakes))
        .route("/api/cycle/last", get(last_cycle))
        .layer(cors_layer(&server.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if parsed.is_empty() {
        return CorsLayer::very_permissive();
    }
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[derive(Serialize)]
struct MessageResp {
    message: String,
}

#[derive(Serialize)]
struct ErrorResp {
    error: String,
}

fn unavailable(e: impl std::fmt::Display) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResp { error: e.to_string() }),
    )
        .into_response()
}

async fn root() -> Json<MessageResp> {
    Json(MessageResp {
        message: "Backend is running".to_string(),
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[derive(Serialize)]
struct FetchResp {
    message: String,
    count: usize,
}

/// Run one ingestion cycle on demand.
async fn fetch_and_save(State(state): State<AppState>) -> (StatusCode, Json<FetchResp>) {
    let report = state.orchestrator.run_cycle().await;
    if report.is_completed() {
        (
            StatusCode::OK,
            Json(FetchResp {
                message: "Earthquake data fetched and saved".to_string(),
                count: report.ingested,
            }),
        )
    } else {
        let reason = report.failure.unwrap_or_else(|| "unknown failure".to_string());
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(FetchResp {
                message: format!("Ingestion failed: {reason}"),
                count: 0,
            }),
        )
    }
}

async fn earthquakes_geojson(State(state): State<AppState>) -> Response {
    match publish(state.store.as_ref()).await {
        Ok(collection) => (
            [(header::CONTENT_TYPE, GEOJSON_CONTENT_TYPE)],
            Json(collection),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "geojson publish failed");
            unavailable(e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

async fn list_earthquakes(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Response {
    match state.store.scan_all().await {
        Ok(rows) => {
            let page: Vec<GeoFeature> = rows
                .iter()
                .skip(q.skip)
                .take(q.limit.min(MAX_PAGE))
                .map(GeoFeature::from)
                .collect();
            Json(page).into_response()
        }
        Err(e) => unavailable(e),
    }
}

async fn last_cycle(State(state): State<AppState>) -> Json<Option<CycleReport>> {
    Json(state.orchestrator.last_report())
}
