// Axum API Server Module
//
// Purpose: REST surface over the risk scanner and the occurrence catalog
// Endpoints (under the configured prefix, default /api/v1):
//   GET  /health
//   POST /risk/scan
//   GET  /species/nearby

use axum::{
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::collaborators::{ClimateSource, GbifClient, OccurrenceSource, OpenMeteoClient};
use crate::config::{Config, OccurrenceBackend};
use crate::data::{Datasets, OccurrenceCatalog};
use crate::pipeline::find_nearby;
use crate::request::{validate_point, validate_radius, RequestError, ScanRequest};
use crate::scanner::{RiskScanner, ScanError};

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub scanner: RiskScanner,
    pub catalog: Arc<OccurrenceCatalog>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire live collaborators around already-loaded datasets
    pub fn new(config: Config, datasets: &Datasets) -> anyhow::Result<Self> {
        tracing::info!("Initializing climate client (Open-Meteo)...");
        let climate = ClimateSource::OpenMeteo(OpenMeteoClient::new(config.climate_timeout)?);

        let occurrences = match config.occurrence_backend {
            OccurrenceBackend::Gbif => {
                tracing::info!("Initializing occurrence client (GBIF)...");
                OccurrenceSource::Gbif(GbifClient::new(config.occurrence_timeout)?)
            }
            OccurrenceBackend::Catalog => {
                tracing::info!("Using static occurrence catalog ({} rows)", datasets.catalog.len());
                OccurrenceSource::Catalog {
                    catalog: Arc::clone(&datasets.catalog),
                    limit: config.catalog_limit,
                }
            }
        };

        Ok(Self::with_sources(config, datasets, climate, occurrences))
    }

    /// Explicit collaborators (tests, offline runs)
    pub fn with_sources(
        config: Config,
        datasets: &Datasets,
        climate: ClimateSource,
        occurrences: OccurrenceSource,
    ) -> Self {
        Self {
            scanner: RiskScanner::new(Arc::clone(&datasets.matrix), climate, occurrences),
            catalog: Arc::clone(&datasets.catalog),
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/risk/scan", post(scan_risk))
        .route("/species/nearby", get(nearby_species));

    let prefix = state.config.api_prefix.clone();
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    };

    router
        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "app": state.config.app_name,
        "env": state.config.env,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn scan_risk(
    State(state): State<AppState>,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let report = state.scanner.scan(payload).await?;

    tracing::info!(
        "Scan complete: {} results, {} tagged in radius",
        report.results.len(),
        report.meta.species_tagged_in_radius
    );

    let body = serde_json::to_value(&report)
        .map_err(|e| AppError::Internal(format!("JSON serialization error: {}", e)))?;
    Ok(Json(body))
}

#[derive(serde::Deserialize, Debug)]
struct NearbyQuery {
    lat: f64,
    lng: f64,
    #[serde(default = "default_nearby_radius_km")]
    radius_km: f64,
    #[serde(default = "default_nearby_limit")]
    limit: usize,
}

fn default_nearby_radius_km() -> f64 {
    5.0
}

fn default_nearby_limit() -> usize {
    50
}

/// Unique catalog species around a point, nearest first
async fn nearby_species(
    State(state): State<AppState>,
    Query(params): Query<NearbyQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    validate_point(params.lat, params.lng)?;
    validate_radius(params.radius_km)?;

    // CPU-bound catalog scan: run in blocking thread pool
    let catalog = Arc::clone(&state.catalog);
    let nearby = tokio::task::spawn_blocking(move || {
        find_nearby(&catalog, params.lat, params.lng, params.radius_km, params.limit)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Catalog scan failed: {}", e)))?;

    Ok(Json(serde_json::json!({
        "rows": nearby.len(),
        "data": nearby,
    })))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(String),
}

impl From<RequestError> for AppError {
    fn from(e: RequestError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<ScanError> for AppError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::InvalidRequest(inner) => inner.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
