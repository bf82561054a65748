//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::logic::model::InferenceError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Request errors
    ValidationError(String),
    PayloadTooLarge(String),

    // Pipeline rejected the record (unseen Type, undefined derived feature)
    InvalidInput(String),

    // Pipeline failed on an otherwise valid record
    PredictionFailed(String),

    // Generic errors
    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PredictionFailed(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the operator
    pub fn message(&self) -> &str {
        match self {
            AppError::ValidationError(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::InvalidInput(msg)
            | AppError::PredictionFailed(msg) => msg.as_str(),
            AppError::InternalError(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::PredictionFailed(msg) => tracing::error!("Prediction failed: {}", msg),
            AppError::InternalError(msg) => tracing::error!("Internal error: {}", msg),
            _ => {}
        }

        let status = self.status();
        let body = Json(json!({
            "error": self.message(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        if err.is_input_error() {
            AppError::InvalidInput(err.to_string())
        } else {
            AppError::PredictionFailed(err.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
