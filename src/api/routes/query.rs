//! Query Routes
//!
//! Read-only views of the measurement store.
//!
//! - GET /api/weather/current - Latest reading, or `null` when none exist
//! - GET /api/weather/history - Readings in the trailing window, oldest first

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::storage::Measurement;

/// GET /api/weather/current
pub async fn current(State(state): State<Arc<AppState>>) -> ApiResult<Json<Option<Measurement>>> {
    let latest = state.store.latest().await?;
    Ok(Json(latest))
}

/// GET /api/weather/history
pub async fn history(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Measurement>>> {
    let window = state.config.history_window();
    let readings = state.store.history(window).await?;

    tracing::debug!(
        count = readings.len(),
        window_hours = state.config.history_window_hours,
        "Served history"
    );
    Ok(Json(readings))
}
