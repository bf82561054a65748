//! Inference logic: feature schema and the model cascade.

pub mod features;
pub mod model;
