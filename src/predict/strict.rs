//! Strict-WHO adapter: the rule labeler's verdict in the predictor's result shape.

use chrono::Utc;

use super::result::{
    InputData, ModelVersion, PredictionResult, QualityLevel, RiskLevel, StrictWhoDetails,
};
use crate::label::{label_sample, LabelConfig};
use crate::sample::{round_to, SensorSample};

/// Clean readings map to at least 50% safe, dirty ones to at most 40%.
///
/// Thresholds come from `cfg`, but the borderline policy is always strict.
pub fn strict_who_prediction(sample: &SensorSample, cfg: &LabelConfig) -> PredictionResult {
    let label = label_sample(sample, &cfg.with_strict(true));
    let pct = label.confidence * 100.0;
    let safe = if label.is_clean {
        round_to(pct.max(50.0), 1)
    } else {
        round_to(pct.min(40.0), 1)
    };

    let risk_level = if !label.is_clean {
        RiskLevel::High
    } else if label.confidence < 0.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    PredictionResult {
        prediction: u8::from(label.is_clean),
        is_safe: label.is_clean,
        safe_probability: safe,
        risk_probability: round_to(100.0 - safe, 1),
        quality_level: QualityLevel::from_safe_probability(safe),
        risk_level,
        recommendations: label.reasons.clone(),
        model_version: ModelVersion::StrictWho,
        input_data: InputData::from_sample(sample),
        post_weighting: None,
        strict_who_details: Some(StrictWhoDetails {
            label: label.label,
            confidence: label.confidence,
            margins: label.margins,
        }),
        timestamp: Utc::now(),
    }
}
