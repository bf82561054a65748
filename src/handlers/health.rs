//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use crate::logic::model::PipelineMode;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    mode: PipelineMode,
    feature_version: u8,
    timestamp: i64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let info = state.pipeline.info();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        mode: info.mode,
        feature_version: info.layout.version,
        timestamp: chrono::Utc::now().timestamp(),
    })
}
