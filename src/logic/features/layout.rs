//! Feature Layout - Centralized Column Definition
//!
//! **CRITICAL: This file controls the column order fed to every model**
//!
//! ## Rules (NEVER break these):
//! 1. Add column → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Change a derivation formula → increment FEATURE_VERSION
//!
//! The offline-trained artifacts were fit on exactly these columns in exactly
//! this order. Reordering does not raise anywhere inside a model, it silently
//! corrupts predictions, so the artifact manifest is checked against this
//! file before any model is loaded.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::logic::model::InferenceError;

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when either layout changes
pub const FEATURE_VERSION: u8 = 2;

// ============================================================================
// FEATURE LAYOUTS (Authoritative source)
// ============================================================================

/// Base columns, in the order the raw sensor record is encoded
pub const BASE_LAYOUT: &[&str] = &[
    "type",                  // 0: Encoded product grade (L/M/H)
    "air_temperature_k",     // 1: Air temperature [K]
    "process_temperature_k", // 2: Process temperature [K]
    "rotational_speed_rpm",  // 3: Rotational speed [rpm]
    "torque_nm",             // 4: Torque [Nm]
    "tool_wear_min",         // 5: Tool wear [min]
];

/// Base columns followed by the derived columns
pub const ENGINEERED_LAYOUT: &[&str] = &[
    "type",
    "air_temperature_k",
    "process_temperature_k",
    "rotational_speed_rpm",
    "torque_nm",
    "tool_wear_min",
    // === Derived (6-8) ===
    "temp_diff",        // 6: process - air
    "torque_x_wear",    // 7: torque * tool wear
    "speed_per_torque", // 8: speed / (torque + 1)
];

pub const BASE_FEATURE_COUNT: usize = 6;
pub const ENGINEERED_FEATURE_COUNT: usize = 9;

/// Which column set the loaded artifacts were trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureLayout {
    Base,
    Engineered,
}

impl FeatureLayout {
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            FeatureLayout::Base => BASE_LAYOUT,
            FeatureLayout::Engineered => ENGINEERED_LAYOUT,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FeatureLayout::Base => BASE_FEATURE_COUNT,
            FeatureLayout::Engineered => ENGINEERED_FEATURE_COUNT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureLayout::Base => "base",
            FeatureLayout::Engineered => "engineered",
        }
    }

    /// CRC32 over the version and the ordered column names
    pub fn hash(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&[FEATURE_VERSION]);

        for name in self.names() {
            hasher.update(name.as_bytes());
            hasher.update(&[0]); // Separator
        }

        hasher.finalize()
    }
}

impl std::fmt::Display for FeatureLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub layout: FeatureLayout,
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn of(layout: FeatureLayout) -> Self {
        Self {
            layout,
            version: FEATURE_VERSION,
            hash: layout.hash(),
            feature_count: layout.len(),
            feature_names: layout.names().iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Check a declared schema version against the compiled one
pub fn validate_version(declared: u8) -> Result<(), InferenceError> {
    if declared != FEATURE_VERSION {
        return Err(InferenceError::SchemaMismatch(format!(
            "artifacts declare schema v{}, this build expects v{}",
            declared, FEATURE_VERSION
        )));
    }
    Ok(())
}

/// Check declared column names against the layout, position by position
pub fn validate_columns<S: AsRef<str>>(
    layout: FeatureLayout,
    declared: &[S],
) -> Result<(), InferenceError> {
    let expected = layout.names();

    for (i, (want, got)) in expected.iter().zip(declared.iter()).enumerate() {
        if *want != got.as_ref() {
            return Err(InferenceError::SchemaMismatch(format!(
                "column {} is {:?}, expected {:?} ({} layout)",
                i,
                got.as_ref(),
                want,
                layout
            )));
        }
    }

    if declared.len() != expected.len() {
        return Err(InferenceError::SchemaMismatch(format!(
            "{} columns declared, {} layout has {}",
            declared.len(),
            layout,
            expected.len()
        )));
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_counts() {
        assert_eq!(BASE_LAYOUT.len(), BASE_FEATURE_COUNT);
        assert_eq!(ENGINEERED_LAYOUT.len(), ENGINEERED_FEATURE_COUNT);
        assert_eq!(FeatureLayout::Base.len(), 6);
        assert_eq!(FeatureLayout::Engineered.len(), 9);
    }

    #[test]
    fn test_engineered_extends_base() {
        assert_eq!(&ENGINEERED_LAYOUT[..BASE_FEATURE_COUNT], BASE_LAYOUT);
    }

    #[test]
    fn test_layout_hash_consistency() {
        assert_eq!(FeatureLayout::Base.hash(), FeatureLayout::Base.hash());
        assert_ne!(FeatureLayout::Base.hash(), FeatureLayout::Engineered.hash());
        assert_ne!(FeatureLayout::Engineered.hash(), 0);
    }

    #[test]
    fn test_validate_columns_success() {
        assert!(validate_columns(FeatureLayout::Engineered, ENGINEERED_LAYOUT).is_ok());
        assert!(validate_columns(FeatureLayout::Base, BASE_LAYOUT).is_ok());
    }

    #[test]
    fn test_validate_columns_swapped() {
        let swapped = [
            "type",
            "process_temperature_k",
            "air_temperature_k",
            "rotational_speed_rpm",
            "torque_nm",
            "tool_wear_min",
        ];
        let err = validate_columns(FeatureLayout::Base, &swapped).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("column 1"), "{}", msg);
    }

    #[test]
    fn test_validate_columns_length() {
        assert!(validate_columns(FeatureLayout::Engineered, BASE_LAYOUT).is_err());
        assert!(validate_columns(FeatureLayout::Base, ENGINEERED_LAYOUT).is_err());
    }

    #[test]
    fn test_validate_version() {
        assert!(validate_version(FEATURE_VERSION).is_ok());
        assert!(validate_version(FEATURE_VERSION + 1).is_err());
    }

    #[test]
    fn test_layout_info() {
        let info = LayoutInfo::of(FeatureLayout::Engineered);
        assert_eq!(info.version, FEATURE_VERSION);
        assert_eq!(info.feature_count, 9);
        assert_eq!(info.feature_names.len(), 9);
    }
}
