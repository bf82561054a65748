//! Type Encoder
//!
//! Maps the product grade to the integer code the models were trained on.

use serde::{Deserialize, Serialize};

use super::error::InferenceError;

/// Static mapping used when no encoder artifact ships with the models
pub const STATIC_CLASSES: &[(&str, i64)] = &[("L", 0), ("M", 1), ("H", 2)];

/// Encoder artifact as exported after training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderArtifact {
    /// Class labels, code = position in this list
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeEncoder {
    /// Hardcoded L=0, M=1, H=2
    Static,
    /// Fitted encoder; the order is whatever training produced
    Fitted { classes: Vec<String> },
}

impl TypeEncoder {
    pub fn fitted(artifact: EncoderArtifact) -> Result<Self, String> {
        if artifact.classes.is_empty() {
            return Err("encoder has no classes".to_string());
        }
        for (i, class) in artifact.classes.iter().enumerate() {
            if artifact.classes[..i].contains(class) {
                return Err(format!("encoder class {:?} appears twice", class));
            }
        }
        Ok(TypeEncoder::Fitted {
            classes: artifact.classes,
        })
    }

    /// Encode a grade. Unseen values are an error, never a default.
    pub fn encode(&self, value: &str) -> Result<i64, InferenceError> {
        let code = match self {
            TypeEncoder::Static => STATIC_CLASSES
                .iter()
                .find(|(class, _)| *class == value)
                .map(|(_, code)| *code),
            TypeEncoder::Fitted { classes } => classes
                .iter()
                .position(|class| class == value)
                .map(|i| i as i64),
        };

        code.ok_or_else(|| InferenceError::UnknownCategory(value.to_string()))
    }

    /// Known classes in code order
    pub fn classes(&self) -> Vec<String> {
        match self {
            TypeEncoder::Static => STATIC_CLASSES.iter().map(|(c, _)| c.to_string()).collect(),
            TypeEncoder::Fitted { classes } => classes.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TypeEncoder::Static => "static",
            TypeEncoder::Fitted { .. } => "fitted",
        }
    }
}
