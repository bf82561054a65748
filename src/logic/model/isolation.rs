//! Isolation Forest - Anomaly Gate
//!
//! Scores a row by how quickly random splits isolate it. Short average path
//! length → easy to isolate → outlier.
//!
//! score    = -2^(-mean_path / c(max_samples))
//! decision = score - offset      (negative → outlier)

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::error::InferenceError;
use super::inference::{check_width, OutlierDetector};
use super::tree::TreeStructure;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// One isolation tree plus the sample counts needed for leaf correction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationTree {
    #[serde(flatten)]
    pub structure: TreeStructure,
    pub n_node_samples: Vec<u64>,
    /// Column subset this tree was fit on; `None` means all columns
    #[serde(default)]
    pub features: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    pub n_features: usize,
    pub max_samples: u64,
    /// Decision threshold fit on the training contamination
    pub offset: f64,
    pub trees: Vec<IsolationTree>,
}

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: u64) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

impl IsolationForest {
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("isolation forest has no trees".to_string());
        }
        if self.max_samples == 0 {
            return Err("max_samples must be positive".to_string());
        }
        if !self.offset.is_finite() {
            return Err("offset is not finite".to_string());
        }

        for (t, tree) in self.trees.iter().enumerate() {
            let inputs = match &tree.features {
                Some(subset) => {
                    if let Some(bad) = subset.iter().find(|&&f| f >= self.n_features) {
                        return Err(format!("tree {} uses column {} out of range", t, bad));
                    }
                    subset.len()
                }
                None => self.n_features,
            };
            tree.structure
                .validate(inputs)
                .map_err(|e| format!("tree {}: {}", t, e))?;
            if tree.n_node_samples.len() != tree.structure.node_count() {
                return Err(format!("tree {}: n_node_samples length mismatch", t));
            }
        }

        Ok(())
    }

    /// Path length of one row through one tree, leaf-corrected
    fn path_length(&self, tree: &IsolationTree, row: &Array1<f64>) -> f64 {
        let hit = match &tree.features {
            Some(subset) => {
                let sub: Array1<f64> = subset.iter().map(|&i| row[i]).collect();
                tree.structure.apply(&sub)
            }
            None => tree.structure.apply(row),
        };
        hit.depth as f64 + average_path_length(tree.n_node_samples[hit.node])
    }

    /// Raw score in [-1, 0); lower is more abnormal
    pub fn score_sample(&self, row: &Array1<f64>) -> Result<f64, InferenceError> {
        check_width("anomaly gate", self.n_features, row)?;

        let total: f64 = self.trees.iter().map(|t| self.path_length(t, row)).sum();
        let mean_path = total / self.trees.len() as f64;
        let normalizer = average_path_length(self.max_samples);

        // A forest grown on a single sample cannot isolate anything
        let exponent = if normalizer > 0.0 { -mean_path / normalizer } else { 0.0 };

        Ok(-(2f64.powf(exponent)))
    }
}

impl OutlierDetector for IsolationForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn decision_function(&self, row: &Array1<f64>) -> Result<f64, InferenceError> {
        Ok(self.score_sample(row)? - self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::inference::Novelty;
    use ndarray::array;

    /// x0 <= 10 isolates quickly on the right; the left side is a deep,
    /// well populated region.
    fn forest() -> IsolationForest {
        let tree = IsolationTree {
            structure: TreeStructure {
                children_left: vec![1, -1, -1],
                children_right: vec![2, -1, -1],
                feature: vec![0, -2, -2],
                threshold: vec![10.0, -2.0, -2.0],
            },
            n_node_samples: vec![256, 255, 1],
            features: None,
        };
        IsolationForest {
            n_features: 2,
            max_samples: 256,
            offset: -0.5,
            trees: vec![tree.clone(), tree],
        }
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // 2 * (ln(255) + gamma) - 2 * 255 / 256
        let expected = 2.0 * (255f64.ln() + EULER_GAMMA) - 2.0 * 255.0 / 256.0;
        assert!((average_path_length(256) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_inlier_and_outlier() {
        let f = forest();
        assert!(f.validate().is_ok());

        // Left leaf: depth 1 + c(255) ≈ c(256) → score ≈ -0.5
        let inlier = f.predict(&array![5.0, 0.0]).unwrap();
        assert_eq!(inlier, Novelty::Inlier);

        // Right leaf: depth 1 + c(1) = 1 → score close to -1
        let outlier = f.predict(&array![50.0, 0.0]).unwrap();
        assert_eq!(outlier, Novelty::Outlier);

        let d = f.decision_function(&array![50.0, 0.0]).unwrap();
        assert!(d < -0.3, "decision was {}", d);
    }

    #[test]
    fn test_feature_subset() {
        let mut f = forest();
        for tree in &mut f.trees {
            tree.features = Some(vec![1]);
        }
        assert!(f.validate().is_ok());
        // Splits now look at column 1 only
        assert_eq!(f.predict(&array![50.0, 0.0]).unwrap(), Novelty::Inlier);
        assert_eq!(f.predict(&array![0.0, 50.0]).unwrap(), Novelty::Outlier);
    }

    #[test]
    fn test_width_mismatch() {
        let err = forest().predict(&array![1.0]).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_subset() {
        let mut f = forest();
        f.trees[0].features = Some(vec![7]);
        assert!(f.validate().is_err());

        let mut f = forest();
        f.trees.clear();
        assert!(f.validate().is_err());
    }
}
