//! Prediction handlers (JSON API)

use axum::{extract::State, Json};
use validator::Validate;

use crate::{AppState, AppError, AppResult};
use crate::logic::features::FeatureRecord;
use crate::models::{
    BatchItem, BatchPredictRequest, BatchPredictResponse, PredictRequest, PredictResponse,
};

/// Classify one record
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> AppResult<Json<PredictResponse>> {
    req.validate()?;

    let record: FeatureRecord = req.into();
    let result = state.pipeline.classify(&record)?;

    Ok(Json(PredictResponse::new(result, state.pipeline.mode())))
}

/// Classify many records; failures are reported per record
pub async fn predict_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchPredictRequest>,
) -> AppResult<Json<BatchPredictResponse>> {
    let count = req.records.len();
    if count > state.config.max_batch_size {
        return Err(AppError::PayloadTooLarge(format!(
            "Batch of {} records exceeds limit of {}",
            count, state.config.max_batch_size
        )));
    }

    // Validation failures are answered directly, the rest go to the pipeline
    let mut results: Vec<Option<BatchItem>> = Vec::with_capacity(count);
    let mut pending: Vec<(usize, FeatureRecord)> = Vec::new();

    for (index, record) in req.records.into_iter().enumerate() {
        match record.validate() {
            Ok(()) => {
                pending.push((index, record.into()));
                results.push(None);
            }
            Err(e) => results.push(Some(BatchItem {
                index,
                result: None,
                error: Some(e.to_string()),
            })),
        }
    }

    let pipeline = state.pipeline.clone();
    let classified = tokio::task::spawn_blocking(move || {
        let records: Vec<FeatureRecord> = pending.iter().map(|(_, r)| r.clone()).collect();
        let outcomes = pipeline.classify_batch(&records);
        pending
            .into_iter()
            .map(|(index, _)| index)
            .zip(outcomes)
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| AppError::InternalError(format!("batch worker failed: {}", e)))?;

    for (index, outcome) in classified {
        let item = match outcome {
            Ok(result) => BatchItem {
                index,
                result: Some(result),
                error: None,
            },
            Err(e) => BatchItem {
                index,
                result: None,
                error: Some(e.to_string()),
            },
        };
        results[index] = Some(item);
    }

    let results: Vec<BatchItem> = results.into_iter().flatten().collect();
    let failed = results.iter().filter(|r| r.error.is_some()).count();

    tracing::info!("Batch classified: {} records, {} failed", count, failed);

    Ok(Json(BatchPredictResponse {
        succeeded: count - failed,
        failed,
        results,
    }))
}
