//! Thin HTTP surface over the detection service and report store.

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::core::db::{NewReport, ReportDb, ReportRepository};
use crate::detection::DamageDetector;
use crate::error::Error;
use crate::geo::ProximityQuery;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<DamageDetector>,
    pub db: ReportDb,
}

pub fn router(state: AppState) -> Router {
    // The `image` field of a nearby-damage item resolves under /images/.
    let images = ServeDir::new(state.db.images_dir());
    Router::new()
        .route("/detect", post(detect_damage))
        .route("/api/nearby-damage-point", get(nearby_damage))
        .route("/health", get(health))
        .nest_service("/images", images)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Wrapper so handler `?` maps the taxonomy onto HTTP statuses: decode
/// faults are the caller's (400), everything else is ours (500).
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError(Error::persistence(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::Decode(_) => StatusCode::BAD_REQUEST,
            Error::Inference(_) | Error::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, "request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn detect_damage(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut image_bytes = None;
    let mut latitude = None;
    let mut longitude = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::decode(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::decode(format!("failed to read upload: {e}")))?;
                image_bytes = Some(bytes);
            }
            Some("latitude") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::decode(format!("failed to read latitude: {e}")))?;
                latitude = Some(
                    text.parse::<f64>()
                        .map_err(|_| Error::decode(format!("invalid latitude {text:?}")))?,
                );
            }
            Some("longitude") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::decode(format!("failed to read longitude: {e}")))?;
                longitude = Some(
                    text.parse::<f64>()
                        .map_err(|_| Error::decode(format!("invalid longitude {text:?}")))?,
                );
            }
            _ => {}
        }
    }

    let image_bytes = image_bytes.ok_or_else(|| Error::decode("missing image upload field"))?;
    let image = image::load_from_memory(&image_bytes).map_err(Error::decode)?;

    let assessment = state.detector.assess_with_timeout(image).await?;
    tracing::debug!(
        class = %assessment.class,
        latitude = ?latitude,
        longitude = ?longitude,
        "detection request assessed"
    );

    let report = NewReport {
        detected_type: assessment.class,
        latitude,
        longitude,
    };
    state.db.add_report(report, &assessment.annotated).await?;

    Ok(Json(json!({ "message": "Report submitted successfully" })))
}

fn default_radius_km() -> f64 {
    ProximityQuery::DEFAULT_RADIUS_KM
}

#[derive(Debug, Deserialize)]
struct NearbyParams {
    lat: f64,
    lon: f64,
    #[serde(default = "default_radius_km")]
    radius_km: f64,
}

#[derive(Debug, Serialize)]
struct NearbyItem {
    id: i64,
    damage_type: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    image: String,
    #[serde(with = "time::serde::rfc3339")]
    datetime: OffsetDateTime,
}

async fn nearby_damage(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<Vec<NearbyItem>>, ApiError> {
    let query =
        ProximityQuery::new(params.lat, params.lon).with_radius_km(params.radius_km);
    let reports = state.db.nearby_reports(&query).await?;

    let items = reports
        .into_iter()
        .map(|report| NearbyItem {
            id: report.id,
            damage_type: report.detected_type,
            latitude: report.latitude,
            longitude: report.longitude,
            image: report.image_fname,
            datetime: report.created_at,
        })
        .collect();

    Ok(Json(items))
}
