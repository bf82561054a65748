//! Engine status handler

use axum::{extract::State, Json};

use crate::AppState;
use crate::models::EngineStatus;

/// Loaded pipeline description plus outcome counters
pub async fn engine(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(EngineStatus {
        pipeline: state.pipeline.info().clone(),
        stats: state.pipeline.stats(),
    })
}
