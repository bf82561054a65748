//! Feature Records
//!
//! Raw sensor record → encoded record → engineered record.
//! All three are built per request and thrown away after the response.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::logic::model::InferenceError;

// ============================================================================
// RAW RECORD
// ============================================================================

/// One observation as entered by the operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Product grade, expected to be one of L / M / H
    #[serde(rename = "type")]
    pub product_type: String,
    pub air_temperature_k: f64,
    pub process_temperature_k: f64,
    pub rotational_speed_rpm: f64,
    pub torque_nm: f64,
    pub tool_wear_min: f64,
}

impl FeatureRecord {
    /// Reject NaN / Inf before anything reaches a model
    pub fn check_finite(&self) -> Result<(), InferenceError> {
        let fields = [
            ("air_temperature_k", self.air_temperature_k),
            ("process_temperature_k", self.process_temperature_k),
            ("rotational_speed_rpm", self.rotational_speed_rpm),
            ("torque_nm", self.torque_nm),
            ("tool_wear_min", self.tool_wear_min),
        ];

        for (name, value) in fields {
            if !value.is_finite() {
                return Err(InferenceError::InvalidInput(format!(
                    "{} must be a finite number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

impl Default for FeatureRecord {
    /// Defaults shown in the input form
    fn default() -> Self {
        Self {
            product_type: "L".to_string(),
            air_temperature_k: 300.0,
            process_temperature_k: 310.0,
            rotational_speed_rpm: 1500.0,
            torque_nm: 40.0,
            tool_wear_min: 100.0,
        }
    }
}

// ============================================================================
// ENCODED RECORD
// ============================================================================

/// Record with the product grade replaced by its integer code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedRecord {
    pub type_code: i64,
    pub air_temperature_k: f64,
    pub process_temperature_k: f64,
    pub rotational_speed_rpm: f64,
    pub torque_nm: f64,
    pub tool_wear_min: f64,
}

impl EncodedRecord {
    pub fn new(record: &FeatureRecord, type_code: i64) -> Self {
        Self {
            type_code,
            air_temperature_k: record.air_temperature_k,
            process_temperature_k: record.process_temperature_k,
            rotational_speed_rpm: record.rotational_speed_rpm,
            torque_nm: record.torque_nm,
            tool_wear_min: record.tool_wear_min,
        }
    }

    /// Values in `BASE_LAYOUT` order
    pub fn to_row(&self) -> Array1<f64> {
        Array1::from(vec![
            self.type_code as f64,
            self.air_temperature_k,
            self.process_temperature_k,
            self.rotational_speed_rpm,
            self.torque_nm,
            self.tool_wear_min,
        ])
    }
}

// ============================================================================
// ENGINEERED RECORD
// ============================================================================

/// Encoded record plus the three derived columns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineeredRecord {
    pub base: EncodedRecord,
    pub temp_diff: f64,
    pub torque_x_wear: f64,
    pub speed_per_torque: f64,
}

impl EngineeredRecord {
    /// Values in `ENGINEERED_LAYOUT` order
    pub fn to_row(&self) -> Array1<f64> {
        let b = &self.base;
        Array1::from(vec![
            b.type_code as f64,
            b.air_temperature_k,
            b.process_temperature_k,
            b.rotational_speed_rpm,
            b.torque_nm,
            b.tool_wear_min,
            self.temp_diff,
            self.torque_x_wear,
            self.speed_per_torque,
        ])
    }
}

/// Compute the derived columns.
///
/// `speed_per_torque` divides by `torque_nm + 1`; a torque of exactly -1 is
/// rejected instead of producing Inf. Finite inputs whose derived value
/// overflows are rejected as input errors too.
pub fn engineer(record: &EncodedRecord) -> Result<EngineeredRecord, InferenceError> {
    let denominator = record.torque_nm + 1.0;
    if denominator == 0.0 {
        return Err(InferenceError::InvalidInput(
            "torque_nm = -1 makes speed_per_torque undefined".to_string(),
        ));
    }

    let engineered = EngineeredRecord {
        base: *record,
        temp_diff: record.process_temperature_k - record.air_temperature_k,
        torque_x_wear: record.torque_nm * record.tool_wear_min,
        speed_per_torque: record.rotational_speed_rpm / denominator,
    };

    let derived = [
        ("temp_diff", engineered.temp_diff),
        ("torque_x_wear", engineered.torque_x_wear),
        ("speed_per_torque", engineered.speed_per_torque),
    ];
    if let Some((name, _)) = derived.iter().find(|(_, v)| !v.is_finite()) {
        return Err(InferenceError::InvalidInput(format!(
            "{} overflows for the given inputs",
            name
        )));
    }

    Ok(engineered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncodedRecord {
        EncodedRecord::new(&FeatureRecord::default(), 0)
    }

    #[test]
    fn test_engineer_example() {
        let e = engineer(&sample()).unwrap();
        assert_eq!(e.temp_diff, 10.0);
        assert_eq!(e.torque_x_wear, 4000.0);
        assert!((e.speed_per_torque - 36.585).abs() < 1e-3);
        assert_eq!(e.speed_per_torque, 1500.0 / 41.0);
    }

    #[test]
    fn test_engineer_is_deterministic() {
        let a = engineer(&sample()).unwrap().to_row();
        let b = engineer(&sample()).unwrap().to_row();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_engineer_rejects_torque_minus_one() {
        let mut record = sample();
        record.torque_nm = -1.0;
        let err = engineer(&record).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInput(_)));
    }

    #[test]
    fn test_engineer_overflow_is_input_error() {
        let mut record = sample();
        record.torque_nm = 1e308;
        record.tool_wear_min = 10.0;
        let err = engineer(&record).unwrap_err();
        assert!(err.is_input_error());
        match err {
            InferenceError::InvalidInput(msg) => assert!(msg.contains("torque_x_wear")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_row_order() {
        let row = engineer(&sample()).unwrap().to_row();
        assert_eq!(row.len(), 9);
        assert_eq!(row[0], 0.0);
        assert_eq!(row[1], 300.0);
        assert_eq!(row[2], 310.0);
        assert_eq!(row[6], 10.0);
        assert_eq!(row[7], 4000.0);

        let base = sample().to_row();
        assert_eq!(base.len(), 6);
        assert_eq!(base[5], 100.0);
    }

    #[test]
    fn test_check_finite() {
        assert!(FeatureRecord::default().check_finite().is_ok());

        let record = FeatureRecord {
            torque_nm: f64::NAN,
            ..Default::default()
        };
        assert!(record.check_finite().is_err());
    }

    #[test]
    fn test_record_json_uses_type_field() {
        let json = r#"{"type":"M","air_temperature_k":298.1,"process_temperature_k":308.6,
            "rotational_speed_rpm":1551,"torque_nm":42.8,"tool_wear_min":0}"#;
        let record: FeatureRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.product_type, "M");
        assert_eq!(record.rotational_speed_rpm, 1551.0);
    }
}
