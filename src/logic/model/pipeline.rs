//! Inference Pipeline - Staged Cascade
//!
//! encode → engineer → scale → anomaly gate → binary gate → multiclass head
//!
//! Cheap, conservative gates run first. An outlier never reaches a
//! classifier, a healthy verdict from the binary gate never reaches the
//! multiclass head. Any stage error aborts the whole request; there is no
//! partial result and no fallback model.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::Serialize;

use super::artifacts::{ArtifactDir, LoadedArtifacts};
use super::encoder::TypeEncoder;
use super::error::InferenceError;
use super::inference::{Classifier, Novelty, OutlierDetector};
use super::labels::{ClassProbabilities, ClassificationResult, FailureLabel};
use super::scaler::Scaler;
use crate::logic::features::{engineer, EncodedRecord, FeatureLayout, FeatureRecord, LayoutInfo};

// ============================================================================
// MODE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// anomaly gate → binary gate → multiclass head
    Cascade,
    /// anomaly gate → multiclass head
    Direct,
}

// ============================================================================
// STATS
// ============================================================================

/// Outcome counters, updated lock-free on every request
#[derive(Debug, Default)]
pub struct InferenceStats {
    total: AtomicU64,
    anomaly: AtomicU64,
    normal: AtomicU64,
    failure: AtomicU64,
    errors: AtomicU64,
    latency_us_sum: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub anomaly: u64,
    pub normal: u64,
    pub failure: u64,
    pub errors: u64,
    pub avg_latency_ms: f64,
}

impl InferenceStats {
    fn record(&self, result: &Result<ClassificationResult, InferenceError>, elapsed: Duration) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.latency_us_sum
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        let counter = match result {
            Ok(ClassificationResult::Anomaly) => &self.anomaly,
            Ok(ClassificationResult::Normal) => &self.normal,
            Ok(ClassificationResult::Failure { .. }) => &self.failure,
            Err(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let sum = self.latency_us_sum.load(Ordering::Relaxed);
        let avg_latency_ms = if total > 0 {
            (sum as f64 / total as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            total,
            anomaly: self.anomaly.load(Ordering::Relaxed),
            normal: self.normal.load(Ordering::Relaxed),
            failure: self.failure.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            avg_latency_ms,
        }
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Building blocks for a pipeline, already parsed
pub struct PipelineParts {
    pub layout: FeatureLayout,
    pub encoder: TypeEncoder,
    pub anomaly_detector: Box<dyn OutlierDetector>,
    pub binary_classifier: Option<Box<dyn Classifier>>,
    pub multiclass_classifier: Box<dyn Classifier>,
    pub binary_scaler: Option<Scaler>,
    pub multiclass_scaler: Option<Scaler>,
}

impl From<LoadedArtifacts> for PipelineParts {
    fn from(a: LoadedArtifacts) -> Self {
        Self {
            layout: a.layout,
            encoder: a.encoder,
            anomaly_detector: Box::new(a.anomaly_detector),
            binary_classifier: a.binary_classifier.map(|m| m.into_model()),
            multiclass_classifier: a.multiclass_classifier.into_model(),
            binary_scaler: a.binary_scaler,
            multiclass_scaler: a.multiclass_scaler,
        }
    }
}

/// Static description for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct PipelineInfo {
    pub mode: PipelineMode,
    pub layout: LayoutInfo,
    pub encoder: &'static str,
    pub encoder_classes: Vec<String>,
    pub binary_scaled: bool,
    pub multiclass_scaled: bool,
    pub source: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

pub struct Pipeline {
    layout: FeatureLayout,
    encoder: TypeEncoder,
    anomaly_detector: Box<dyn OutlierDetector>,
    binary_classifier: Option<Box<dyn Classifier>>,
    multiclass_classifier: Box<dyn Classifier>,
    binary_scaler: Option<Scaler>,
    multiclass_scaler: Option<Scaler>,
    info: PipelineInfo,
    stats: InferenceStats,
}

fn scale(scaler: Option<&Scaler>, row: &Array1<f64>) -> Result<Array1<f64>, InferenceError> {
    match scaler {
        Some(s) => s.transform(row),
        None => Ok(row.clone()),
    }
}

impl Pipeline {
    /// Load and validate every artifact under `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let dir = dir.as_ref();
        tracing::info!("Loading inference artifacts from: {}", dir.display());

        let loaded = ArtifactDir::new(dir).load()?;
        let mut pipeline = Self::from_parts(loaded.into())?;
        pipeline.info.source = Some(dir.display().to_string());

        tracing::info!("Inference pipeline ready (mode: {:?})", pipeline.info.mode);
        Ok(pipeline)
    }

    /// Assemble from parts; every model must be fit on the layout's width
    pub fn from_parts(parts: PipelineParts) -> Result<Self, InferenceError> {
        let width = parts.layout.len();
        let widths = [
            ("anomaly detector", Some(parts.anomaly_detector.n_features())),
            ("binary classifier", parts.binary_classifier.as_ref().map(|m| m.n_features())),
            ("multiclass classifier", Some(parts.multiclass_classifier.n_features())),
            ("binary scaler", parts.binary_scaler.as_ref().map(|s| s.n_features())),
            ("multiclass scaler", parts.multiclass_scaler.as_ref().map(|s| s.n_features())),
        ];
        for (name, n) in widths {
            if let Some(n) = n {
                if n != width {
                    return Err(InferenceError::SchemaMismatch(format!(
                        "{} expects {} features, {} layout has {}",
                        name, n, parts.layout, width
                    )));
                }
            }
        }

        let mode = if parts.binary_classifier.is_some() {
            PipelineMode::Cascade
        } else {
            PipelineMode::Direct
        };

        let info = PipelineInfo {
            mode,
            layout: LayoutInfo::of(parts.layout),
            encoder: parts.encoder.kind(),
            encoder_classes: parts.encoder.classes(),
            binary_scaled: parts.binary_scaler.is_some(),
            multiclass_scaled: parts.multiclass_scaler.is_some(),
            source: None,
            loaded_at: Utc::now(),
        };

        Ok(Self {
            layout: parts.layout,
            encoder: parts.encoder,
            anomaly_detector: parts.anomaly_detector,
            binary_classifier: parts.binary_classifier,
            multiclass_classifier: parts.multiclass_classifier,
            binary_scaler: parts.binary_scaler,
            multiclass_scaler: parts.multiclass_scaler,
            info,
            stats: InferenceStats::default(),
        })
    }

    pub fn mode(&self) -> PipelineMode {
        self.info.mode
    }

    pub fn info(&self) -> &PipelineInfo {
        &self.info
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Encode (and engineer, if the layout asks for it) one record
    pub fn features(&self, record: &FeatureRecord) -> Result<Array1<f64>, InferenceError> {
        record.check_finite()?;

        let code = self.encoder.encode(&record.product_type)?;
        let encoded = EncodedRecord::new(record, code);

        let row = match self.layout {
            FeatureLayout::Base => encoded.to_row(),
            FeatureLayout::Engineered => engineer(&encoded)?.to_row(),
        };

        if row.len() != self.layout.len() {
            return Err(InferenceError::ShapeMismatch {
                stage: "features",
                expected: self.layout.len(),
                actual: row.len(),
            });
        }
        Ok(row)
    }

    /// Run the cascade on one record
    pub fn classify(&self, record: &FeatureRecord) -> Result<ClassificationResult, InferenceError> {
        let start = Instant::now();
        let result = self.run(record);
        self.stats.record(&result, start.elapsed());

        match &result {
            Ok(r) => tracing::debug!("Classified {:?} → {}", record.product_type, r.as_str()),
            Err(e) => tracing::warn!("Classification failed: {}", e),
        }
        result
    }

    /// Classify many records; one bad record does not affect the others
    pub fn classify_batch(
        &self,
        records: &[FeatureRecord],
    ) -> Vec<Result<ClassificationResult, InferenceError>> {
        records.iter().map(|r| self.classify(r)).collect()
    }

    fn run(&self, record: &FeatureRecord) -> Result<ClassificationResult, InferenceError> {
        let features = self.features(record)?;

        // Stage 1: anomaly gate
        let gate_row = scale(self.binary_scaler.as_ref(), &features)?;
        if self.anomaly_detector.predict(&gate_row)? == Novelty::Outlier {
            tracing::debug!("Anomaly gate: outlier, skipping classifiers");
            return Ok(ClassificationResult::Anomaly);
        }

        // Stage 2: binary gate (cascade mode only)
        if let Some(binary) = &self.binary_classifier {
            let label = binary.predict(&gate_row)?;
            if label == FailureLabel::Normal.code() {
                tracing::debug!("Binary gate: normal");
                return Ok(ClassificationResult::Normal);
            }
        }

        // Stage 3: multiclass head on its own scaling
        let multi_row = scale(self.multiclass_scaler.as_ref(), &features)?;
        let code = self.multiclass_classifier.predict(&multi_row)?;
        let label = FailureLabel::try_from(code)?;

        if !label.is_failure() {
            return Ok(ClassificationResult::Normal);
        }

        let probabilities = match self.multiclass_classifier.predict_proba(&multi_row) {
            Some(proba) => Some(ClassProbabilities::from_model(
                self.multiclass_classifier.classes(),
                &proba?,
            )?),
            None => None,
        };

        Ok(ClassificationResult::Failure {
            label,
            probabilities,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("mode", &self.info.mode)
            .field("layout", &self.layout)
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
