//! Artifact Manifest and Loading
//!
//! The artifact directory holds one `manifest.json` plus one JSON file per
//! fitted object. The manifest pins the schema version and the exact column
//! order; every file is checked (existence, optional SHA-256, parse,
//! structure, width) before the pipeline is built.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::classifier::ClassifierArtifact;
use super::encoder::{EncoderArtifact, TypeEncoder};
use super::error::InferenceError;
use super::isolation::IsolationForest;
use super::labels::FailureLabel;
use super::scaler::Scaler;
use crate::logic::features::layout::{validate_columns, validate_version, FeatureLayout};

pub const MANIFEST_FILE: &str = "manifest.json";

// ============================================================================
// MANIFEST
// ============================================================================

/// Pointer to one artifact file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Path relative to the artifact directory
    pub file: String,
    /// Lowercase hex SHA-256 of the file contents
    #[serde(default)]
    pub sha256: Option<String>,
}

impl ArtifactRef {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            sha256: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub schema_version: u8,
    pub layout: FeatureLayout,
    /// Column names in training order
    pub features: Vec<String>,
    /// Fitted Type encoder; the static L/M/H mapping is used when absent
    #[serde(default)]
    pub encoder: Option<ArtifactRef>,
    pub anomaly_detector: ArtifactRef,
    /// Present → three-stage cascade, absent → anomaly gate then multiclass
    #[serde(default)]
    pub binary_classifier: Option<ArtifactRef>,
    pub multiclass_classifier: ArtifactRef,
    /// Scaler for the anomaly gate and the binary gate
    #[serde(default)]
    pub binary_scaler: Option<ArtifactRef>,
    /// Scaler for the multiclass head, fit separately
    #[serde(default)]
    pub multiclass_scaler: Option<ArtifactRef>,
}

// ============================================================================
// LOADED ARTIFACTS
// ============================================================================

/// Everything the pipeline needs, parsed and validated
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub layout: FeatureLayout,
    pub encoder: TypeEncoder,
    pub anomaly_detector: IsolationForest,
    pub binary_classifier: Option<ClassifierArtifact>,
    pub multiclass_classifier: ClassifierArtifact,
    pub binary_scaler: Option<Scaler>,
    pub multiclass_scaler: Option<Scaler>,
}

/// Lowercase hex SHA-256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn invalid(path: &Path, reason: impl Into<String>) -> InferenceError {
    InferenceError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Read-only view over an artifact directory
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    root: PathBuf,
}

impl ArtifactDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, file: &str, sha256: Option<&str>) -> Result<(Vec<u8>, PathBuf), InferenceError> {
        let path = self.root.join(file);
        if !path.is_file() {
            return Err(InferenceError::ArtifactMissing(path));
        }

        let bytes = fs::read(&path).map_err(|source| InferenceError::ArtifactIo {
            path: path.clone(),
            source,
        })?;

        if let Some(expected) = sha256 {
            let actual = sha256_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(InferenceError::ChecksumMismatch {
                    path,
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        Ok((bytes, path))
    }

    fn parse<T: DeserializeOwned>(&self, artifact: &ArtifactRef) -> Result<(T, PathBuf), InferenceError> {
        let (bytes, path) = self.read(&artifact.file, artifact.sha256.as_deref())?;
        let value = serde_json::from_slice(&bytes).map_err(|source| InferenceError::ArtifactParse {
            path: path.clone(),
            source,
        })?;
        Ok((value, path))
    }

    pub fn read_manifest(&self) -> Result<ArtifactManifest, InferenceError> {
        self.parse(&ArtifactRef::new(MANIFEST_FILE)).map(|(m, _)| m)
    }

    /// Read the manifest and every artifact it names
    pub fn load(&self) -> Result<LoadedArtifacts, InferenceError> {
        let manifest = self.read_manifest()?;

        // Schema first: nothing is parsed against the wrong columns
        validate_version(manifest.schema_version)?;
        validate_columns(manifest.layout, &manifest.features)?;
        let layout = manifest.layout;

        let encoder = match &manifest.encoder {
            Some(r) => {
                let (artifact, path) = self.parse::<EncoderArtifact>(r)?;
                TypeEncoder::fitted(artifact).map_err(|e| invalid(&path, e))?
            }
            None => TypeEncoder::Static,
        };

        let (anomaly_detector, path) = self.parse::<IsolationForest>(&manifest.anomaly_detector)?;
        anomaly_detector.validate().map_err(|e| invalid(&path, e))?;
        check_width(&path, anomaly_detector.n_features, layout)?;

        let binary_classifier = match &manifest.binary_classifier {
            Some(r) => {
                let (model, path) = self.parse::<ClassifierArtifact>(r)?;
                model.validate().map_err(|e| invalid(&path, e))?;
                check_width(&path, model.n_features(), layout)?;
                if !model.classes().contains(&FailureLabel::Normal.code()) {
                    return Err(invalid(&path, "binary classifier has no class 0 (normal)"));
                }
                Some(model)
            }
            None => None,
        };

        let (multiclass_classifier, path) =
            self.parse::<ClassifierArtifact>(&manifest.multiclass_classifier)?;
        multiclass_classifier.validate().map_err(|e| invalid(&path, e))?;
        check_width(&path, multiclass_classifier.n_features(), layout)?;
        for &class in multiclass_classifier.classes() {
            if FailureLabel::try_from(class).is_err() {
                return Err(invalid(&path, format!("class {} is not a known failure label", class)));
            }
        }

        let binary_scaler = self.load_scaler(manifest.binary_scaler.as_ref(), layout)?;
        let multiclass_scaler = self.load_scaler(manifest.multiclass_scaler.as_ref(), layout)?;

        tracing::info!(
            "Artifacts loaded from {} (layout: {}, encoder: {}, binary gate: {})",
            self.root.display(),
            layout,
            encoder.kind(),
            binary_classifier.is_some()
        );

        Ok(LoadedArtifacts {
            layout,
            encoder,
            anomaly_detector,
            binary_classifier,
            multiclass_classifier,
            binary_scaler,
            multiclass_scaler,
        })
    }

    fn load_scaler(
        &self,
        artifact: Option<&ArtifactRef>,
        layout: FeatureLayout,
    ) -> Result<Option<Scaler>, InferenceError> {
        let Some(artifact) = artifact else {
            return Ok(None);
        };
        let (scaler, path) = self.parse::<Scaler>(artifact)?;
        scaler.validate().map_err(|e| invalid(&path, e))?;
        check_width(&path, scaler.n_features(), layout)?;
        Ok(Some(scaler))
    }
}

fn check_width(path: &Path, n: usize, layout: FeatureLayout) -> Result<(), InferenceError> {
    if n != layout.len() {
        return Err(invalid(
            path,
            format!("fit on {} features, {} layout has {}", n, layout, layout.len()),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small but well-formed artifact set for tests.

    use std::fs;
    use std::path::Path;

    use serde_json::json;

    use super::MANIFEST_FILE;
    use crate::logic::features::layout::ENGINEERED_LAYOUT;

    pub fn isolation_forest() -> serde_json::Value {
        // Outlier when tool wear (column 5) is above 250 min
        json!({
            "n_features": 9,
            "max_samples": 256,
            "offset": -0.5,
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [5, -2, -2],
                "threshold": [250.0, -2.0, -2.0],
                "n_node_samples": [256, 255, 1]
            }]
        })
    }

    pub fn binary_forest() -> serde_json::Value {
        // Failure when torque (column 4) is above 60 Nm
        json!({
            "kind": "forest",
            "n_features": 9,
            "classes": [0, 1],
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [4, -2, -2],
                "threshold": [60.0, -2.0, -2.0],
                "value": [[10.0, 10.0], [9.0, 1.0], [1.0, 9.0]]
            }]
        })
    }

    pub fn multiclass_forest() -> serde_json::Value {
        // Overstrain when torque_x_wear (column 7) is above 10000, else power failure
        json!({
            "kind": "forest",
            "n_features": 9,
            "classes": [0, 1, 2, 3, 4, 5],
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [7, -2, -2],
                "threshold": [10000.0, -2.0, -2.0],
                "value": [
                    [1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
                    [0.0, 1.0, 1.0, 6.0, 1.0, 1.0],
                    [0.0, 1.0, 0.0, 1.0, 7.0, 1.0]
                ]
            }]
        })
    }

    pub fn identity_scaler() -> serde_json::Value {
        json!({
            "kind": "standard",
            "n_features": 9,
            "mean": vec![0.0; 9],
            "scale": vec![1.0; 9]
        })
    }

    pub fn manifest() -> serde_json::Value {
        json!({
            "schema_version": crate::logic::features::layout::FEATURE_VERSION,
            "layout": "engineered",
            "features": ENGINEERED_LAYOUT,
            "encoder": { "file": "encoder_type.json" },
            "anomaly_detector": { "file": "model_iso.json" },
            "binary_classifier": { "file": "model_binary_best.json" },
            "multiclass_classifier": { "file": "model_multiclass.json" },
            "binary_scaler": { "file": "scaler_binary.json" },
            "multiclass_scaler": { "file": "scaler_multiclass.json" }
        })
    }

    pub fn write(dir: &Path, file: &str, value: &serde_json::Value) {
        fs::write(dir.join(file), serde_json::to_vec_pretty(value).unwrap()).unwrap();
    }

    /// Write the full cascade artifact set into `dir`
    pub fn write_all(dir: &Path) {
        write(dir, MANIFEST_FILE, &manifest());
        write(dir, "encoder_type.json", &json!({ "classes": ["L", "M", "H"] }));
        write(dir, "model_iso.json", &isolation_forest());
        write(dir, "model_binary_best.json", &binary_forest());
        write(dir, "model_multiclass.json", &multiclass_forest());
        write(dir, "scaler_binary.json", &identity_scaler());
        write(dir, "scaler_multiclass.json", &identity_scaler());
    }
}
