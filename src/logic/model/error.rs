//! Inference Error
//!
//! One error type for the whole pipeline: artifact loading, schema checks,
//! encoding, scaling and model calls all surface as `InferenceError`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("failed to read artifact {}: {source}", .path.display())]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {}: {source}", .path.display())]
    ArtifactParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {} is invalid: {reason}", .path.display())]
    ArtifactInvalid { path: PathBuf, reason: String },

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("shape mismatch in {stage}: expected {expected} features, got {actual}")]
    ShapeMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unseen category for Type: {0:?}")]
    UnknownCategory(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("non-finite value produced in {stage}")]
    NonFinite { stage: &'static str },

    #[error("model returned unknown label {0}")]
    UnknownLabel(i64),

    #[error("model error: {0}")]
    Model(String),
}

impl InferenceError {
    /// True when the caller supplied bad input, as opposed to a broken artifact.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            InferenceError::UnknownCategory(_) | InferenceError::InvalidInput(_)
        )
    }
}
