//! Scalers
//!
//! Fitted numeric transforms applied after feature engineering. The gate
//! branch (anomaly + binary) and the multiclass branch each get their own
//! instance; they are fit separately and must not be swapped.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::error::InferenceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Scaler {
    /// (x - mean) / scale
    Standard {
        n_features: usize,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    /// x * scale + min
    MinMax {
        n_features: usize,
        min: Vec<f64>,
        scale: Vec<f64>,
    },
}

impl Scaler {
    pub fn n_features(&self) -> usize {
        match self {
            Scaler::Standard { n_features, .. } | Scaler::MinMax { n_features, .. } => *n_features,
        }
    }

    /// Check parameter arrays agree with the declared width
    pub fn validate(&self) -> Result<(), String> {
        let (a, b) = match self {
            Scaler::Standard { mean, scale, .. } => (mean, scale),
            Scaler::MinMax { min, scale, .. } => (min, scale),
        };
        let n = self.n_features();

        if a.len() != n || b.len() != n {
            return Err(format!(
                "scaler declares {} features but has {} / {} parameters",
                n,
                a.len(),
                b.len()
            ));
        }
        if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err("scaler parameters contain non-finite values".to_string());
        }

        Ok(())
    }

    pub fn transform(&self, row: &Array1<f64>) -> Result<Array1<f64>, InferenceError> {
        if row.len() != self.n_features() {
            return Err(InferenceError::ShapeMismatch {
                stage: "scale",
                expected: self.n_features(),
                actual: row.len(),
            });
        }

        let scaled: Array1<f64> = match self {
            Scaler::Standard { mean, scale, .. } => row
                .iter()
                .zip(mean.iter().zip(scale.iter()))
                .map(|(x, (m, s))| {
                    // Constant columns are fit with scale 0
                    let s = if *s == 0.0 { 1.0 } else { *s };
                    (x - m) / s
                })
                .collect(),
            Scaler::MinMax { min, scale, .. } => row
                .iter()
                .zip(min.iter().zip(scale.iter()))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
        };

        if scaled.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::NonFinite { stage: "scale" });
        }

        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let scaler = Scaler::Standard {
            n_features: 3,
            mean: vec![1.0, 10.0, 5.0],
            scale: vec![2.0, 5.0, 0.0],
        };
        let out = scaler.transform(&array![3.0, 0.0, 7.0]).unwrap();
        assert_eq!(out, array![1.0, -2.0, 2.0]);
    }

    #[test]
    fn test_minmax_scaler() {
        let scaler = Scaler::MinMax {
            n_features: 2,
            min: vec![-0.5, 0.0],
            scale: vec![0.1, 2.0],
        };
        let out = scaler.transform(&array![10.0, 0.25]).unwrap();
        assert!((out[0] - 0.5).abs() < 1e-12);
        assert_eq!(out[1], 0.5);
    }

    #[test]
    fn test_width_mismatch() {
        let scaler = Scaler::Standard {
            n_features: 2,
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
        };
        let err = scaler.transform(&array![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::ShapeMismatch { expected: 2, actual: 3, .. }
        ));
    }

    #[test]
    fn test_overflow_is_non_finite() {
        let scaler = Scaler::MinMax {
            n_features: 1,
            min: vec![0.0],
            scale: vec![f64::MAX],
        };
        assert!(matches!(
            scaler.transform(&array![10.0]).unwrap_err(),
            InferenceError::NonFinite { .. }
        ));
    }

    #[test]
    fn test_parse_and_validate() {
        let json = r#"{"kind":"standard","n_features":2,"mean":[1.0],"scale":[1.0,1.0]}"#;
        let scaler: Scaler = serde_json::from_str(json).unwrap();
        assert!(scaler.validate().is_err());

        let json = r#"{"kind":"minmax","n_features":1,"min":[0.0],"scale":[1.0]}"#;
        let scaler: Scaler = serde_json::from_str(json).unwrap();
        assert!(scaler.validate().is_ok());
    }
}
