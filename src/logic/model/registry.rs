//! Pipeline Registry
//!
//! Process-wide, init-once holder for the loaded pipeline. Artifacts are read
//! from disk exactly once; every request afterwards shares the same
//! immutable handle.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::error::InferenceError;
use super::pipeline::Pipeline;

static PIPELINE: OnceCell<Arc<Pipeline>> = OnceCell::new();

/// Load the pipeline on first call, return the cached handle afterwards.
///
/// A failed load leaves the cell empty so a later call can retry.
pub fn init(dir: impl AsRef<Path>) -> Result<Arc<Pipeline>, InferenceError> {
    PIPELINE
        .get_or_try_init(|| Pipeline::load(dir.as_ref()).map(Arc::new))
        .cloned()
}
