// src/predict/mod.rs
//! Statistical predictor: pretrained classifier + weighted risk adjustment +
//! safety overrides, degrading to a rule-only fallback.
//!
//! Pipeline for one reading:
//! 1. hard override for extreme readings (no model involved)
//! 2. classifier on (pH, turbidity)
//! 3. safe probability scaled by the weighted deviation factor
//! 4. secondary override when the model says "safe" but two danger signals fire
//! 5. quality/risk tiers and recommendations
//!
//! Any [`ModelError`] in steps 2-5 yields the fallback result instead.

pub mod fallback;
pub mod model;
pub mod result;
pub mod safety;
pub mod scoring;
pub mod strict;
pub mod weights;

pub use fallback::fallback_prediction;
pub use model::{load_model, Classifier, ModelArtifact, ModelError, ModelInput};
pub use result::{
    InputData, ModelVersion, PostWeighting, PredictionResult, QualityLevel, RiskLevel,
    StrictWhoDetails,
};
pub use strict::strict_who_prediction;
pub use weights::{load_weights, FeatureWeights};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::sample::{round_to, SensorSample};
use scoring::{weighted_factor, MIN_FACTOR};

/// Shared handle to a loaded classifier.
pub type DynClassifier = Arc<dyn Classifier>;

/// Builds the classifier on first use.
pub type ClassifierLoader = Box<dyn Fn() -> Result<DynClassifier, ModelError> + Send + Sync>;

/// Owns the classifier (loaded lazily, once) and the feature weights.
pub struct Predictor {
    model_path: Option<PathBuf>,
    weights_path: Option<PathBuf>,
    weights: FeatureWeights,
    loader: Option<ClassifierLoader>,
    classifier: OnceCell<DynClassifier>,
}

/// Snapshot for `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictorStatus {
    pub is_loaded: bool,
    pub model_kind: Option<&'static str>,
    pub model_path: Option<String>,
    pub model_exists: bool,
    pub weights_path: Option<String>,
    pub weights_exists: bool,
    pub weights: FeatureWeights,
    pub min_factor: f64,
}

impl Predictor {
    /// Predictor whose artifact at `model_path` is read on first use.
    pub fn new(model_path: impl Into<PathBuf>, weights: FeatureWeights) -> Self {
        let model_path = model_path.into();
        let path = model_path.clone();
        let loader: ClassifierLoader = Box::new(move || -> Result<DynClassifier, ModelError> {
            let artifact = load_model(&path)?;
            info!(path = %path.display(), kind = artifact.kind(), "classifier loaded");
            Ok(Arc::new(artifact) as DynClassifier)
        });
        Self {
            model_path: Some(model_path),
            ..Self::with_loader(loader, weights)
        }
    }

    /// Predictor that builds its classifier with `loader` on first use.
    pub fn with_loader(loader: ClassifierLoader, weights: FeatureWeights) -> Self {
        Self {
            model_path: None,
            weights_path: None,
            weights,
            loader: Some(loader),
            classifier: OnceCell::new(),
        }
    }

    /// Load weights from `weights_path` now; the model stays lazy.
    pub fn from_paths(model_path: impl Into<PathBuf>, weights_path: impl Into<PathBuf>) -> Self {
        let weights_path = weights_path.into();
        let weights = load_weights(&weights_path);
        Self {
            weights_path: Some(weights_path),
            ..Self::new(model_path, weights)
        }
    }

    /// Predictor around an already-built classifier (other backends, tests).
    pub fn with_classifier(classifier: DynClassifier, weights: FeatureWeights) -> Self {
        Self {
            model_path: None,
            weights_path: None,
            weights,
            loader: None,
            classifier: OnceCell::with_value(classifier),
        }
    }

    pub fn weights(&self) -> &FeatureWeights {
        &self.weights
    }

    pub fn is_loaded(&self) -> bool {
        self.classifier.get().is_some()
    }

    /// Classifier, loading it on the first call. A failed load is retried on
    /// the next call; concurrent first calls share a single load.
    fn classifier(&self) -> Result<&DynClassifier, ModelError> {
        self.classifier.get_or_try_init(|| {
            let load = self
                .loader
                .as_ref()
                .ok_or_else(|| ModelError::NotFound(PathBuf::new()))?;
            load()
        })
    }

    /// Predict from raw values. Never fails.
    pub fn predict(
        &self,
        ph: Option<f64>,
        turbidity: Option<f64>,
        tds: Option<f64>,
    ) -> PredictionResult {
        self.predict_sample(&SensorSample::new(ph, tds, turbidity))
    }

    pub fn predict_sample(&self, sample: &SensorSample) -> PredictionResult {
        let sample = sample.without_nan();
        let result = match self.try_predict(&sample) {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, ?sample, "prediction failed, using fallback rules");
                fallback_prediction(&sample)
            }
        };
        crate::metrics::record_prediction(&result);
        debug!(
            path = result.model_version.path(),
            safe = result.safe_probability,
            quality = result.quality_level.as_str(),
            "prediction"
        );
        result
    }

    fn try_predict(&self, sample: &SensorSample) -> Result<PredictionResult, ModelError> {
        let critical = safety::critical_reasons(sample);
        if !critical.is_empty() {
            warn!(?sample, reasons = ?critical, "safety override, model skipped");
            return Ok(override_result(sample, critical));
        }

        let classifier = self.classifier()?;
        let input = ModelInput::new(sample.ph, sample.turbidity)?;
        let proba = classifier.predict_proba(&input)?;
        if !proba.iter().all(|p| p.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        let mut prediction = model::argmax(proba);
        let adjustment = weighted_factor(sample, &self.weights);
        let mut safe = adjustment.apply(proba[1] * 100.0);

        if prediction == 1 {
            let signals = safety::danger_signals(sample);
            if signals.len() >= safety::SECONDARY_OVERRIDE_MIN_SIGNALS {
                warn!(?sample, ?signals, "model said safe, overriding");
                prediction = 0;
                safe = safe.min(safety::SECONDARY_OVERRIDE_CAP);
            }
        }

        let is_safe = prediction == 1;
        let ec = sample.ec_ms_cm();
        Ok(PredictionResult {
            prediction,
            is_safe,
            safe_probability: safe,
            risk_probability: round_to(100.0 - safe, 1),
            quality_level: QualityLevel::from_safe_probability(safe),
            risk_level: safety::risk_level(sample, ec),
            recommendations: safety::recommendations(sample, ec, is_safe),
            model_version: ModelVersion::PhNtu,
            input_data: InputData::from_sample(sample),
            post_weighting: Some(adjustment.to_post_weighting(&self.weights)),
            strict_who_details: None,
            timestamp: Utc::now(),
        })
    }

    pub fn status(&self) -> PredictorStatus {
        let show = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());
        let exists = |p: &Option<PathBuf>| p.as_deref().is_some_and(Path::exists);
        PredictorStatus {
            is_loaded: self.is_loaded(),
            model_kind: self.classifier.get().map(|c| c.kind()),
            model_path: show(&self.model_path),
            model_exists: exists(&self.model_path),
            weights_path: show(&self.weights_path),
            weights_exists: exists(&self.weights_path),
            weights: self.weights,
            min_factor: MIN_FACTOR,
        }
    }
}

fn override_result(sample: &SensorSample, reasons: Vec<&'static str>) -> PredictionResult {
    let mut recommendations: Vec<String> = reasons.into_iter().map(String::from).collect();
    recommendations.push(safety::DANGER_NOTICE.to_string());
    PredictionResult {
        prediction: 0,
        is_safe: false,
        safe_probability: 5.0,
        risk_probability: 95.0,
        quality_level: QualityLevel::VeryPoor,
        risk_level: RiskLevel::High,
        recommendations,
        model_version: ModelVersion::SafetyOverride,
        input_data: InputData::from_sample(sample),
        post_weighting: None,
        strict_who_details: None,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Always returns the same distribution.
    struct Fixed(f64);

    impl Classifier for Fixed {
        fn predict_proba(&self, _: &ModelInput) -> Result<[f64; 2], ModelError> {
            Ok([1.0 - self.0, self.0])
        }
        fn kind(&self) -> &'static str {
            "fixed"
        }
    }

    fn predictor(p_safe: f64) -> Predictor {
        Predictor::with_classifier(Arc::new(Fixed(p_safe)), FeatureWeights::defaults())
    }

    #[test]
    fn override_skips_model() {
        let r = predictor(0.99).predict(Some(4.0), Some(0.5), Some(300.0));
        assert_eq!(r.model_version, ModelVersion::SafetyOverride);
        assert_eq!(r.safe_probability, 5.0);
        assert_eq!(r.recommendations.last().unwrap(), safety::DANGER_NOTICE);
    }

    #[test]
    fn primary_path_attaches_post_weighting() {
        let r = predictor(0.9).predict(Some(7.0), Some(0.5), Some(300.0));
        assert_eq!(r.model_version, ModelVersion::PhNtu);
        assert_eq!(r.safe_probability, 90.0);
        assert_eq!(r.quality_level, QualityLevel::Excellent);
        assert_eq!(r.post_weighting.as_ref().unwrap().factor, 1.0);
    }

    #[test]
    fn secondary_override_caps_safe_probability() {
        let r = predictor(0.95).predict(Some(5.5), Some(6.0), Some(300.0));
        assert_eq!(r.prediction, 0);
        assert!(!r.is_safe);
        assert!(r.safe_probability <= 25.0);
    }

    #[test]
    fn missing_turbidity_falls_back() {
        let r = predictor(0.9).predict(Some(7.0), None, Some(300.0));
        assert_eq!(r.model_version, ModelVersion::Fallback);
        assert!(!r.is_safe);
    }

    #[test]
    fn missing_artifact_falls_back_and_stays_unloaded() {
        let p = Predictor::new("/no/such/model.json", FeatureWeights::defaults());
        let r = p.predict(Some(7.0), Some(0.5), Some(300.0));
        assert_eq!(r.model_version, ModelVersion::Fallback);
        assert!(r.is_safe);
        assert!(!p.is_loaded());
        assert!(!p.status().model_exists);
    }

    #[test]
    fn nan_probabilities_fall_back() {
        let r = predictor(f64::NAN).predict(Some(7.0), Some(0.5), Some(300.0));
        assert_eq!(r.model_version, ModelVersion::Fallback);
    }
}
