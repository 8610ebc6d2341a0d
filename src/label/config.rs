// src/label/config.rs
use serde::{Deserialize, Serialize};

fn default_ph_min() -> f64 {
    6.5
}
fn default_ph_max() -> f64 {
    8.5
}
fn default_ntu_clean_max() -> f64 {
    1.0
}
fn default_ntu_borderline_max() -> f64 {
    5.0
}
fn default_tds_clean_max() -> f64 {
    500.0
}
fn default_tds_borderline_max() -> f64 {
    1000.0
}
fn default_true() -> bool {
    true
}

/// Thresholds and policy flags for the rule labeler.
///
/// Defaults follow the strict WHO-inspired policy for domestic drinking water.
/// Every field has a serde default so a partial `[label]` table in the service
/// config only overrides what it names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Inclusive lower bound of the clean pH band.
    #[serde(default = "default_ph_min")]
    pub ph_min: f64,
    /// Inclusive upper bound of the clean pH band.
    #[serde(default = "default_ph_max")]
    pub ph_max: f64,
    #[serde(default = "default_ntu_clean_max")]
    pub ntu_clean_max: f64,
    #[serde(default = "default_ntu_borderline_max")]
    pub ntu_borderline_max: f64,
    #[serde(default = "default_tds_clean_max")]
    pub tds_clean_max: f64,
    #[serde(default = "default_tds_borderline_max")]
    pub tds_borderline_max: f64,
    /// Borderline turbidity/TDS counts as a violation when true.
    #[serde(default = "default_true")]
    pub strict: bool,
    /// Missing metrics count as a violation when true.
    #[serde(default = "default_true")]
    pub require_all_metrics: bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            ph_min: default_ph_min(),
            ph_max: default_ph_max(),
            ntu_clean_max: default_ntu_clean_max(),
            ntu_borderline_max: default_ntu_borderline_max(),
            tds_clean_max: default_tds_clean_max(),
            tds_borderline_max: default_tds_borderline_max(),
            strict: true,
            require_all_metrics: true,
        }
    }
}

impl LabelConfig {
    /// Same thresholds, different borderline policy.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_require_all_metrics(mut self, require: bool) -> Self {
        self.require_all_metrics = require;
        self
    }

    /// Repair inverted bands so downstream comparisons stay meaningful.
    pub fn sanitized(mut self) -> Self {
        if self.ph_min > self.ph_max {
            std::mem::swap(&mut self.ph_min, &mut self.ph_max);
        }
        if self.ntu_clean_max > self.ntu_borderline_max {
            std::mem::swap(&mut self.ntu_clean_max, &mut self.ntu_borderline_max);
        }
        if self.tds_clean_max > self.tds_borderline_max {
            std::mem::swap(&mut self.tds_clean_max, &mut self.tds_borderline_max);
        }
        self
    }
}
