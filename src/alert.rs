//! Alerts raised from prediction results.
//!
//! Delivery (email, push) lives with the caller; this module only decides
//! whether a result deserves an alert and what it says.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::predict::{ModelVersion, PredictionResult, RiskLevel};

/// Alert severity mirrors the risk tier.
pub type Severity = RiskLevel;

/// Which engine produced the verdict behind the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertKind {
    Ai,
    Rule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    New,
    Acknowledged,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub status: AlertStatus,
    pub message: String,
    pub model_version: ModelVersion,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// `Some` when the result is unsafe or high risk.
    pub fn from_prediction(result: &PredictionResult) -> Option<Self> {
        if !result.needs_alert() {
            return None;
        }
        let kind = match result.model_version {
            ModelVersion::StrictWho | ModelVersion::Fallback => AlertKind::Rule,
            ModelVersion::PhNtu | ModelVersion::SafetyOverride => AlertKind::Ai,
        };
        let advice = result
            .recommendations
            .first()
            .map(String::as_str)
            .unwrap_or("no recommendation");
        Some(Self {
            kind,
            severity: result.risk_level,
            status: AlertStatus::New,
            message: format!(
                "Water quality {} (safe {:.1}%): {}",
                result.quality_level.as_str(),
                result.safe_probability,
                advice
            ),
            model_version: result.model_version,
            created_at: result.timestamp,
        })
    }

    pub fn acknowledge(&mut self) {
        if self.status == AlertStatus::New {
            self.status = AlertStatus::Acknowledged;
        }
    }

    pub fn resolve(&mut self) {
        self.status = AlertStatus::Resolved;
    }
}
