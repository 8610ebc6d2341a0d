//! Rule-only verdict used when the classifier is unavailable or fails.

use chrono::Utc;

use super::result::{InputData, ModelVersion, PredictionResult, QualityLevel, RiskLevel};
use crate::sample::SensorSample;

/// Safe iff pH in `[6.5, 8.5]`, turbidity at most 4 NTU and TDS in `[50, 1000]`.
/// An absent metric fails its rule.
pub fn fallback_prediction(sample: &SensorSample) -> PredictionResult {
    let mut reasons: Vec<String> = Vec::new();
    if !sample.ph.is_some_and(|ph| (6.5..=8.5).contains(&ph)) {
        reasons.push("pH outside limits".into());
    }
    if !sample.turbidity.is_some_and(|t| t <= 4.0) {
        reasons.push("Turbidity too high".into());
    }
    if !sample.tds.is_some_and(|t| (50.0..=1000.0).contains(&t)) {
        reasons.push("TDS outside limits".into());
    }

    let is_safe = reasons.is_empty();
    if is_safe {
        reasons.push("Quality acceptable".into());
    }
    let (safe, quality, risk) = if is_safe {
        (75.0, QualityLevel::Good, RiskLevel::Low)
    } else {
        (25.0, QualityLevel::Poor, RiskLevel::High)
    };

    PredictionResult {
        prediction: u8::from(is_safe),
        is_safe,
        safe_probability: safe,
        risk_probability: 100.0 - safe,
        quality_level: quality,
        risk_level: risk,
        recommendations: reasons,
        model_version: ModelVersion::Fallback,
        input_data: InputData::from_sample(sample),
        post_weighting: None,
        strict_who_details: None,
        timestamp: Utc::now(),
    }
}
