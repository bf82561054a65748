//! Classifiers - Binary Gate and Multiclass Head
//!
//! Two exported model families:
//! - `forest`: tree ensemble, probabilities = mean of per-tree leaf distributions
//! - `logistic`: linear model, sigmoid for one row of coefficients, softmax otherwise

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::error::InferenceError;
use super::inference::{argmax, check_width, Classifier};
use super::tree::TreeStructure;

// ============================================================================
// ARTIFACT
// ============================================================================

/// Classifier artifact as exported after training
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClassifierArtifact {
    Forest(ForestClassifier),
    Logistic(LogisticClassifier),
}

impl ClassifierArtifact {
    pub fn n_features(&self) -> usize {
        match self {
            ClassifierArtifact::Forest(m) => m.n_features,
            ClassifierArtifact::Logistic(m) => m.n_features,
        }
    }

    pub fn classes(&self) -> &[i64] {
        match self {
            ClassifierArtifact::Forest(m) => &m.classes,
            ClassifierArtifact::Logistic(m) => &m.classes,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            ClassifierArtifact::Forest(m) => m.validate(),
            ClassifierArtifact::Logistic(m) => m.validate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierArtifact::Forest(_) => "forest",
            ClassifierArtifact::Logistic(_) => "logistic",
        }
    }

    pub fn into_model(self) -> Box<dyn Classifier> {
        match self {
            ClassifierArtifact::Forest(m) => Box::new(m),
            ClassifierArtifact::Logistic(m) => Box::new(m),
        }
    }
}

fn validate_classes(classes: &[i64]) -> Result<(), String> {
    if classes.len() < 2 {
        return Err(format!("classifier needs at least 2 classes, has {}", classes.len()));
    }
    for (i, c) in classes.iter().enumerate() {
        if classes[..i].contains(c) {
            return Err(format!("class {} appears twice", c));
        }
    }
    Ok(())
}

// ============================================================================
// FOREST
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationTree {
    #[serde(flatten)]
    pub structure: TreeStructure,
    /// Per-node class weights (counts or fractions), one column per class
    pub value: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestClassifier {
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub trees: Vec<ClassificationTree>,
}

impl ForestClassifier {
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }

        for (t, tree) in self.trees.iter().enumerate() {
            tree.structure
                .validate(self.n_features)
                .map_err(|e| format!("tree {}: {}", t, e))?;
            if tree.value.len() != tree.structure.node_count() {
                return Err(format!("tree {}: value has wrong node count", t));
            }
            for (i, weights) in tree.value.iter().enumerate() {
                if weights.len() != self.classes.len() {
                    return Err(format!("tree {} node {}: expected {} class weights", t, i, self.classes.len()));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(format!("tree {} node {}: invalid class weight", t, i));
                }
                let is_leaf = tree.structure.children_left[i] == super::tree::TREE_LEAF;
                if is_leaf && weights.iter().sum::<f64>() <= 0.0 {
                    return Err(format!("tree {} leaf {} has zero total weight", t, i));
                }
            }
        }

        Ok(())
    }

    fn proba(&self, row: &Array1<f64>) -> Result<Vec<f64>, InferenceError> {
        check_width("classifier", self.n_features, row)?;

        let mut acc = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.structure.apply(row).node;
            let weights = &tree.value[leaf];
            let total: f64 = weights.iter().sum();
            for (a, w) in acc.iter_mut().zip(weights) {
                *a += w / total;
            }
        }

        let n = self.trees.len() as f64;
        Ok(acc.into_iter().map(|a| a / n).collect())
    }
}

impl Classifier for ForestClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict(&self, row: &Array1<f64>) -> Result<i64, InferenceError> {
        let proba = self.proba(row)?;
        argmax(&proba)
            .map(|i| self.classes[i])
            .ok_or_else(|| InferenceError::Model("empty probability vector".to_string()))
    }

    fn predict_proba(&self, row: &Array1<f64>) -> Option<Result<Vec<f64>, InferenceError>> {
        Some(self.proba(row))
    }
}

// ============================================================================
// LOGISTIC
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub n_features: usize,
    pub classes: Vec<i64>,
    /// One row for a binary model, one row per class otherwise
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LogisticClassifier {
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;

        let rows = self.coef.len();
        let binary = self.classes.len() == 2 && rows == 1;
        if !binary && rows != self.classes.len() {
            return Err(format!(
                "{} coefficient rows for {} classes",
                rows,
                self.classes.len()
            ));
        }
        if self.intercept.len() != rows {
            return Err(format!("{} intercepts for {} coefficient rows", self.intercept.len(), rows));
        }
        if self.coef.iter().any(|r| r.len() != self.n_features) {
            return Err(format!("coefficient rows must have {} entries", self.n_features));
        }
        if self
            .coef
            .iter()
            .flatten()
            .chain(self.intercept.iter())
            .any(|v| !v.is_finite())
        {
            return Err("coefficients contain non-finite values".to_string());
        }

        Ok(())
    }

    fn weights(&self) -> Result<Array2<f64>, InferenceError> {
        let flat: Vec<f64> = self.coef.iter().flatten().copied().collect();
        Array2::from_shape_vec((self.coef.len(), self.n_features), flat)
            .map_err(|e| InferenceError::Model(format!("coefficient shape: {}", e)))
    }

    fn proba(&self, row: &Array1<f64>) -> Result<Vec<f64>, InferenceError> {
        check_width("classifier", self.n_features, row)?;

        let logits = self.weights()?.dot(row) + &Array1::from(self.intercept.clone());

        let proba = if logits.len() == 1 {
            let p = 1.0 / (1.0 + (-logits[0]).exp());
            vec![1.0 - p, p]
        } else {
            let max = logits.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            let exp: Vec<f64> = logits.iter().map(|v| (v - max).exp()).collect();
            let total: f64 = exp.iter().sum();
            exp.into_iter().map(|e| e / total).collect()
        };

        if proba.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::NonFinite { stage: "classifier" });
        }
        Ok(proba)
    }
}

impl Classifier for LogisticClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict(&self, row: &Array1<f64>) -> Result<i64, InferenceError> {
        let proba = self.proba(row)?;
        argmax(&proba)
            .map(|i| self.classes[i])
            .ok_or_else(|| InferenceError::Model("empty probability vector".to_string()))
    }

    fn predict_proba(&self, row: &Array1<f64>) -> Option<Result<Vec<f64>, InferenceError>> {
        Some(self.proba(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn stump(threshold: f64, left: Vec<f64>, right: Vec<f64>) -> ClassificationTree {
        let n = left.len();
        ClassificationTree {
            structure: TreeStructure {
                children_left: vec![1, -1, -1],
                children_right: vec![2, -1, -1],
                feature: vec![0, -2, -2],
                threshold: vec![threshold, -2.0, -2.0],
            },
            value: vec![vec![1.0; n], left, right],
        }
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = ForestClassifier {
            n_features: 1,
            classes: vec![0, 1],
            trees: vec![
                stump(5.0, vec![8.0, 2.0], vec![0.0, 4.0]),
                stump(7.0, vec![1.0, 0.0], vec![1.0, 3.0]),
            ],
        };
        assert!(forest.validate().is_ok());

        // x = 6: tree0 right [0, 1], tree1 left [1, 0] → [0.5, 0.5], first wins
        let p = forest.predict_proba(&array![6.0]).unwrap().unwrap();
        assert_eq!(p, vec![0.5, 0.5]);
        assert_eq!(forest.predict(&array![6.0]).unwrap(), 0);

        // x = 9: [0, 1] and [0.25, 0.75]
        let p = forest.predict_proba(&array![9.0]).unwrap().unwrap();
        assert!((p[1] - 0.875).abs() < 1e-12);
        assert_eq!(forest.predict(&array![9.0]).unwrap(), 1);
    }

    #[test]
    fn test_forest_returns_class_labels_not_indices() {
        let forest = ForestClassifier {
            n_features: 1,
            classes: vec![1, 2, 4],
            trees: vec![stump(0.0, vec![0.0, 0.0, 5.0], vec![0.0, 5.0, 0.0])],
        };
        assert_eq!(forest.predict(&array![-1.0]).unwrap(), 4);
        assert_eq!(forest.predict(&array![1.0]).unwrap(), 2);
    }

    #[test]
    fn test_forest_validate() {
        let mut forest = ForestClassifier {
            n_features: 1,
            classes: vec![0, 1],
            trees: vec![stump(0.0, vec![0.0, 0.0], vec![1.0, 1.0])],
        };
        // Zero-weight leaf
        assert!(forest.validate().is_err());

        forest.trees[0].value[1] = vec![1.0];
        assert!(forest.validate().is_err());

        forest.classes = vec![0];
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_logistic_binary() {
        let model = LogisticClassifier {
            n_features: 2,
            classes: vec![0, 1],
            coef: vec![vec![1.0, -1.0]],
            intercept: vec![0.0],
        };
        assert!(model.validate().is_ok());

        let p = model.predict_proba(&array![0.0, 0.0]).unwrap().unwrap();
        assert_eq!(p, vec![0.5, 0.5]);
        assert_eq!(model.predict(&array![3.0, 0.0]).unwrap(), 1);
        assert_eq!(model.predict(&array![0.0, 3.0]).unwrap(), 0);
    }

    #[test]
    fn test_logistic_multinomial() {
        let model = LogisticClassifier {
            n_features: 1,
            classes: vec![0, 1, 2],
            coef: vec![vec![0.0], vec![1.0], vec![-1.0]],
            intercept: vec![0.0, 0.0, 0.0],
        };
        assert!(model.validate().is_ok());

        let p = model.predict_proba(&array![2.0]).unwrap().unwrap();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&array![2.0]).unwrap(), 1);
        assert_eq!(model.predict(&array![-2.0]).unwrap(), 2);
    }

    #[test]
    fn test_logistic_validate_shapes() {
        let model = LogisticClassifier {
            n_features: 2,
            classes: vec![0, 1, 2],
            coef: vec![vec![1.0, 1.0]],
            intercept: vec![0.0],
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_artifact_tagged_json() {
        let json = r#"{
            "kind": "logistic",
            "n_features": 1,
            "classes": [0, 1],
            "coef": [[2.0]],
            "intercept": [-1.0]
        }"#;
        let artifact: ClassifierArtifact = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.kind(), "logistic");
        assert_eq!(artifact.n_features(), 1);
        assert!(artifact.validate().is_ok());

        let model = artifact.into_model();
        assert_eq!(model.predict(&array![1.0]).unwrap(), 1);
    }
}
