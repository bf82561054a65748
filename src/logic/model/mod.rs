//! Model Module - Inference Engine
//!
//! Artifact loading, fitted transforms, native model scorers and the
//! staged cascade that ties them together.

pub mod artifacts;
pub mod classifier;
pub mod encoder;
pub mod error;
pub mod inference;
pub mod isolation;
pub mod labels;
pub mod pipeline;
pub mod registry;
pub mod scaler;
pub mod tree;

// Re-export common types
pub use error::InferenceError;
pub use labels::{ClassProbabilities, ClassificationResult};
pub use pipeline::{Pipeline, PipelineInfo, PipelineMode, StatsSnapshot};
