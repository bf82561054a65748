//! Labels and Classification Result
//!
//! Closed, ordinal label set shared with training. Never reorder:
//! the integer codes are what the multiclass model emits.

use serde::{Deserialize, Serialize};

use super::error::InferenceError;

// ============================================================================
// FAILURE LABEL
// ============================================================================

pub const LABEL_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureLabel {
    Normal,
    ToolWearFailure,
    HeatDissipationFailure,
    PowerFailure,
    OverstrainFailure,
    RandomFailure,
}

impl FailureLabel {
    pub const ALL: [FailureLabel; LABEL_COUNT] = [
        FailureLabel::Normal,
        FailureLabel::ToolWearFailure,
        FailureLabel::HeatDissipationFailure,
        FailureLabel::PowerFailure,
        FailureLabel::OverstrainFailure,
        FailureLabel::RandomFailure,
    ];

    pub fn code(&self) -> i64 {
        match self {
            FailureLabel::Normal => 0,
            FailureLabel::ToolWearFailure => 1,
            FailureLabel::HeatDissipationFailure => 2,
            FailureLabel::PowerFailure => 3,
            FailureLabel::OverstrainFailure => 4,
            FailureLabel::RandomFailure => 5,
        }
    }

    /// Short code used in the maintenance dataset
    pub fn short_code(&self) -> &'static str {
        match self {
            FailureLabel::Normal => "OK",
            FailureLabel::ToolWearFailure => "TWF",
            FailureLabel::HeatDissipationFailure => "HDF",
            FailureLabel::PowerFailure => "PWF",
            FailureLabel::OverstrainFailure => "OSF",
            FailureLabel::RandomFailure => "RNF",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FailureLabel::Normal => "Normal",
            FailureLabel::ToolWearFailure => "Tool Wear Failure",
            FailureLabel::HeatDissipationFailure => "Heat Dissipation Failure",
            FailureLabel::PowerFailure => "Power Failure",
            FailureLabel::OverstrainFailure => "Overstrain Failure",
            FailureLabel::RandomFailure => "Random Failure",
        }
    }

    pub fn is_failure(&self) -> bool {
        *self != FailureLabel::Normal
    }
}

impl TryFrom<i64> for FailureLabel {
    type Error = InferenceError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        FailureLabel::ALL
            .iter()
            .copied()
            .find(|l| l.code() == code)
            .ok_or(InferenceError::UnknownLabel(code))
    }
}

impl std::fmt::Display for FailureLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_failure() {
            write!(f, "{} ({})", self.display_name(), self.short_code())
        } else {
            write!(f, "{}", self.display_name())
        }
    }
}

// ============================================================================
// CLASS PROBABILITIES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelProbability {
    pub label: FailureLabel,
    pub code: i64,
    pub probability: f64,
}

/// Probability over all six labels, ordered by code.
/// Informational only, never changes the decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProbabilities([f64; LABEL_COUNT]);

impl ClassProbabilities {
    /// Spread a model's `(classes, proba)` pair onto the six labels.
    /// Labels the model never saw get probability 0.
    pub fn from_model(classes: &[i64], proba: &[f64]) -> Result<Self, InferenceError> {
        if classes.len() != proba.len() {
            return Err(InferenceError::Model(format!(
                "{} classes but {} probabilities",
                classes.len(),
                proba.len()
            )));
        }

        let mut values = [0.0; LABEL_COUNT];
        for (&class, &p) in classes.iter().zip(proba) {
            let label = FailureLabel::try_from(class)?;
            if !p.is_finite() {
                return Err(InferenceError::NonFinite { stage: "predict_proba" });
            }
            values[label.code() as usize] = p;
        }

        Ok(Self(values))
    }

    pub fn get(&self, label: FailureLabel) -> f64 {
        self.0[label.code() as usize]
    }

    #[cfg(test)]
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn entries(&self) -> Vec<LabelProbability> {
        FailureLabel::ALL
            .iter()
            .map(|&label| LabelProbability {
                label,
                code: label.code(),
                probability: self.get(label),
            })
            .collect()
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries().serialize(serializer)
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClassificationResult {
    /// Out of distribution, nothing downstream was run
    Anomaly,
    /// No failure predicted
    Normal,
    /// Specific failure type
    Failure {
        label: FailureLabel,
        #[serde(skip_serializing_if = "Option::is_none")]
        probabilities: Option<ClassProbabilities>,
    },
}

impl ClassificationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationResult::Anomaly => "anomaly",
            ClassificationResult::Normal => "normal",
            ClassificationResult::Failure { .. } => "failure",
        }
    }

    /// Human-readable message for the result area
    pub fn message(&self) -> String {
        match self {
            ClassificationResult::Anomaly => {
                "Unknown / anomaly detected, manual investigation required".to_string()
            }
            ClassificationResult::Normal => "Prediction: Normal".to_string(),
            ClassificationResult::Failure { label, .. } => format!("Prediction: {}", label),
        }
    }

    pub fn probabilities(&self) -> Option<&ClassProbabilities> {
        match self {
            ClassificationResult::Failure { probabilities, .. } => probabilities.as_ref(),
            _ => None,
        }
    }
}
