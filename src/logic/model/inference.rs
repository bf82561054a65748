//! Inference Traits
//!
//! Seams between the cascade and the concrete models, so a model family can
//! be swapped without touching the pipeline.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::error::InferenceError;

/// Anomaly gate verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Novelty {
    Inlier,
    Outlier,
}


/// Unsupervised outlier model
pub trait OutlierDetector: Send + Sync {
    fn n_features(&self) -> usize;

    /// Signed score, negative means outlier
    fn decision_function(&self, row: &Array1<f64>) -> Result<f64, InferenceError>;

    fn predict(&self, row: &Array1<f64>) -> Result<Novelty, InferenceError> {
        let score = self.decision_function(row)?;
        if score.is_nan() {
            return Err(InferenceError::NonFinite { stage: "anomaly gate" });
        }
        Ok(if score < 0.0 {
            Novelty::Outlier
        } else {
            Novelty::Inlier
        })
    }
}

/// Supervised classifier over integer labels
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// Integer labels, in the column order of `predict_proba`
    fn classes(&self) -> &[i64];

    fn predict(&self, row: &Array1<f64>) -> Result<i64, InferenceError>;

    /// Class probabilities aligned with `classes()`, if the model has them
    fn predict_proba(&self, _row: &Array1<f64>) -> Option<Result<Vec<f64>, InferenceError>> {
        None
    }
}

/// Reject a row whose width differs from what the model was fit on
pub fn check_width(stage: &'static str, expected: usize, row: &Array1<f64>) -> Result<(), InferenceError> {
    if row.len() != expected {
        return Err(InferenceError::ShapeMismatch {
            stage,
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

/// Index of the largest value, first one on ties
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        let better = match best {
            Some((_, b)) => v > b,
            None => true,
        };
        if better {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[1.0]), Some(0));
        assert_eq!(argmax(&[]), None);
    }
}
