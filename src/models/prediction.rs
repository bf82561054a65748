//! Prediction request/response models

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::logic::features::FeatureRecord;
use crate::logic::model::{ClassificationResult, PipelineInfo, PipelineMode, StatsSnapshot};

/// One sensor record, from the JSON API or the HTML form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PredictRequest {
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 8, message = "Type is required"))]
    pub product_type: String,

    #[validate(range(exclusive_min = 0.0, max = 1000.0, message = "Air temperature must be a positive Kelvin value"))]
    pub air_temperature_k: f64,

    #[validate(range(exclusive_min = 0.0, max = 1000.0, message = "Process temperature must be a positive Kelvin value"))]
    pub process_temperature_k: f64,

    #[validate(range(min = 0.0, message = "Rotational speed cannot be negative"))]
    pub rotational_speed_rpm: f64,

    pub torque_nm: f64,

    #[validate(range(min = 0.0, message = "Tool wear cannot be negative"))]
    pub tool_wear_min: f64,
}

impl From<PredictRequest> for FeatureRecord {
    fn from(req: PredictRequest) -> Self {
        FeatureRecord {
            product_type: req.product_type,
            air_temperature_k: req.air_temperature_k,
            process_temperature_k: req.process_temperature_k,
            rotational_speed_rpm: req.rotational_speed_rpm,
            torque_nm: req.torque_nm,
            tool_wear_min: req.tool_wear_min,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub result: ClassificationResult,
    pub message: String,
    pub mode: PipelineMode,
}

impl PredictResponse {
    pub fn new(result: ClassificationResult, mode: PipelineMode) -> Self {
        Self {
            message: result.message(),
            result,
            mode,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchPredictRequest {
    pub records: Vec<PredictRequest>,
}

/// Outcome for one record of a batch; exactly one of `result` / `error` is set
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchPredictResponse {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
}

#[derive(Debug, Serialize)]
pub struct EngineStatus {
    pub pipeline: PipelineInfo,
    pub stats: StatsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PredictRequest {
        serde_json::from_str(
            r#"{"type":"L","air_temperature_k":300.0,"process_temperature_k":310.0,
                "rotational_speed_rpm":1500,"torque_nm":40.0,"tool_wear_min":100}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_request() {
        let req = request();
        assert!(req.validate().is_ok());

        let record: FeatureRecord = req.into();
        assert_eq!(record, FeatureRecord::default());
    }

    #[test]
    fn test_negative_tool_wear_rejected() {
        let mut req = request();
        req.tool_wear_min = -5.0;
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("tool_wear_min"));
    }

    #[test]
    fn test_zero_kelvin_rejected() {
        let mut req = request();
        req.air_temperature_k = 0.0;
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("air_temperature_k"));

        let mut req = request();
        req.process_temperature_k = 0.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_type_rejected() {
        let mut req = request();
        req.product_type = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_unknown_type_passes_validation() {
        // Category membership is the encoder's job
        let mut req = request();
        req.product_type = "X".to_string();
        assert!(req.validate().is_ok());
    }
}
