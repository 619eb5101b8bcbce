//! Ingest Routes
//!
//! - POST /api/weather/update - Store a reading and push it to live viewers

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{IngestRequest, IngestResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::NewMeasurement;
use crate::websocket::ReadingUpdate;

/// POST /api/weather/update
///
/// Validate, persist, then broadcast. The response reflects the write only;
/// broadcast failures are handled by the hub.
pub async fn update(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> ApiResult<Json<IngestResponse>> {
    let Json(req) = payload?;
    let measurement = validate_ingest_request(&req)?;

    let stored = state.store.insert(measurement).await?;

    tracing::info!(
        id = stored.id,
        temperature = stored.temperature,
        humidity = stored.humidity,
        "Reading ingested"
    );

    state.hub.publish(ReadingUpdate::from(&stored));

    Ok(Json(IngestResponse { success: true }))
}

/// Validate an ingest request before any side effect
pub fn validate_ingest_request(req: &IngestRequest) -> ApiResult<NewMeasurement> {
    let temperature = require_finite("temperature", req.temperature)?;
    let humidity = require_finite("humidity", req.humidity)?;

    Ok(NewMeasurement::new(temperature, humidity))
}

fn require_finite(field: &str, value: Option<f64>) -> ApiResult<f64> {
    match value {
        None => Err(ApiError::Validation(format!("{} is required", field))),
        Some(v) if !v.is_finite() => {
            Err(ApiError::Validation(format!("{} must be a finite number", field)))
        }
        Some(v) => Ok(v),
    }
}
