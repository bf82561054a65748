//! Features Module - Feature Schema and Records
//!
//! Column layout, raw/encoded/engineered records.

pub mod layout;
pub mod record;

// Re-export common types
pub use layout::{FeatureLayout, LayoutInfo};
pub use record::{engineer, EncodedRecord, FeatureRecord};
