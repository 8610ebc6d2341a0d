//! Result shape shared by every prediction path.
//!
//! Callers persist `prediction`, `safe_probability`, `quality_level`,
//! `risk_level`, `recommendations` and `model_version`, so the enum tags
//! serialize to the stable uppercase strings stored alongside readings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::label::{Label, Margins};
use crate::sample::{round_to, SensorSample};

/// Quality tier derived from the safe probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl QualityLevel {
    /// `>=80` EXCELLENT, `>=65` GOOD, `>=50` FAIR, `>=30` POOR, else VERY_POOR.
    pub fn from_safe_probability(safe_prob: f64) -> Self {
        if safe_prob >= 80.0 {
            Self::Excellent
        } else if safe_prob >= 65.0 {
            Self::Good
        } else if safe_prob >= 50.0 {
            Self::Fair
        } else if safe_prob >= 30.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Fair => "FAIR",
            Self::Poor => "POOR",
            Self::VeryPoor => "VERY_POOR",
        }
    }
}

/// Risk tier. Ordered so `HIGH` compares greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// 0 → LOW, 1..=2 → MEDIUM, 3+ → HIGH.
    pub fn from_factor_count(count: u8) -> Self {
        match count {
            0 => Self::Low,
            1 | 2 => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// Which code path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVersion {
    #[serde(rename = "SAFETY_OVERRIDE_v1.0")]
    SafetyOverride,
    #[serde(rename = "PH_NTU_v1.0")]
    PhNtu,
    #[serde(rename = "FALLBACK_v1.0")]
    Fallback,
    #[serde(rename = "STRICT_WHO_v1.0")]
    StrictWho,
}

impl ModelVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SafetyOverride => "SAFETY_OVERRIDE_v1.0",
            Self::PhNtu => "PH_NTU_v1.0",
            Self::Fallback => "FALLBACK_v1.0",
            Self::StrictWho => "STRICT_WHO_v1.0",
        }
    }

    /// Short label used for metrics and logs.
    pub fn path(&self) -> &'static str {
        match self {
            Self::SafetyOverride => "safety_override",
            Self::PhNtu => "primary_model",
            Self::Fallback => "fallback",
            Self::StrictWho => "strict_who",
        }
    }
}

/// Echo of the inputs plus derived conductivity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputData {
    pub ph: Option<f64>,
    pub turbidity_ntu: Option<f64>,
    pub tds_ppm: Option<f64>,
    pub ec_ms_cm: f64,
}

impl InputData {
    pub fn from_sample(sample: &SensorSample) -> Self {
        Self {
            ph: sample.ph,
            turbidity_ntu: sample.turbidity,
            tds_ppm: sample.tds,
            ec_ms_cm: round_to(sample.ec_ms_cm(), 3),
        }
    }
}

/// Diagnostics of the weighted risk adjustment (primary path only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostWeighting {
    pub factor: f64,
    pub risk_score: f64,
    /// Per-feature deviation in `[0,1]`, keyed by `ph`, `Turbidity`, `Solids`.
    pub deviations: BTreeMap<String, f64>,
    pub weights_used: BTreeMap<String, f64>,
}

/// Rule labeler details carried by the strict-WHO path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrictWhoDetails {
    pub label: Label,
    pub confidence: f64,
    pub margins: Margins,
}

/// Output of every prediction path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 1 = safe, 0 = unsafe.
    pub prediction: u8,
    pub is_safe: bool,
    pub safe_probability: f64,
    pub risk_probability: f64,
    pub quality_level: QualityLevel,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub model_version: ModelVersion,
    pub input_data: InputData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_weighting: Option<PostWeighting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_who_details: Option<StrictWhoDetails>,
    pub timestamp: DateTime<Utc>,
}

impl PredictionResult {
    /// Whether callers should raise a user-visible alert for this result.
    pub fn needs_alert(&self) -> bool {
        self.risk_level == RiskLevel::High || !self.is_safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_thresholds_are_inclusive() {
        assert_eq!(QualityLevel::from_safe_probability(80.0), QualityLevel::Excellent);
        assert_eq!(QualityLevel::from_safe_probability(79.9), QualityLevel::Good);
        assert_eq!(QualityLevel::from_safe_probability(65.0), QualityLevel::Good);
        assert_eq!(QualityLevel::from_safe_probability(50.0), QualityLevel::Fair);
        assert_eq!(QualityLevel::from_safe_probability(30.0), QualityLevel::Poor);
        assert_eq!(QualityLevel::from_safe_probability(29.9), QualityLevel::VeryPoor);
    }

    #[test]
    fn risk_from_count() {
        assert_eq!(RiskLevel::from_factor_count(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_factor_count(2), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_factor_count(4), RiskLevel::High);
    }

    #[test]
    fn tags_serialize_to_stored_strings() {
        assert_eq!(
            serde_json::to_value(QualityLevel::VeryPoor).unwrap(),
            serde_json::json!("VERY_POOR")
        );
        assert_eq!(
            serde_json::to_value(RiskLevel::Medium).unwrap(),
            serde_json::json!("MEDIUM")
        );
        for v in [
            ModelVersion::SafetyOverride,
            ModelVersion::PhNtu,
            ModelVersion::Fallback,
            ModelVersion::StrictWho,
        ] {
            assert_eq!(serde_json::to_value(v).unwrap(), serde_json::json!(v.as_str()));
        }
    }
}
