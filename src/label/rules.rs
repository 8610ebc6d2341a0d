//! Strict WHO-threshold rule labeler.
//!
//! Maps a reading to `clean` / `dirty`:
//! - pH clean if `ph_min <= pH <= ph_max`
//! - turbidity clean if `NTU <= ntu_clean_max` (up to `ntu_borderline_max` is borderline)
//! - TDS clean if `<= tds_clean_max` (up to `tds_borderline_max` is borderline)
//!
//! Under the strict policy borderline readings are violations. Missing metrics
//! are violations when `require_all_metrics` is set.
//!
//! Confidence is the tightest of the three margins into the ideal zone, so a
//! reading barely inside one bound is only as confident as that bound allows.

use serde::{Deserialize, Serialize};

use super::LabelConfig;
use crate::sample::round_to;

/// Binary drinking-water label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Clean,
    Dirty,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Dirty => "dirty",
        }
    }
}

/// Normalized distance into the ideal zone per metric, each in `[0,1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub ph: f64,
    pub tds: f64,
    pub ntu: f64,
}

impl Margins {
    /// Smallest of the three margins.
    pub fn min(&self) -> f64 {
        self.ph.min(self.tds).min(self.ntu)
    }

    fn rounded(self) -> Self {
        Self {
            ph: round_to(self.ph, 3),
            tds: round_to(self.tds, 3),
            ntu: round_to(self.ntu, 3),
        }
    }
}

/// Output of [`compute_label`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelResult {
    pub label: Label,
    pub is_clean: bool,
    pub reasons: Vec<String>,
    pub confidence: f64,
    pub margins: Margins,
}

/// Compute per-metric margins. Always computed, whatever the label.
///
/// pH uses the distance to the nearest bound in pH units; TDS and turbidity use
/// the remaining headroom below `clean_max` as a fraction of `clean_max`.
pub fn compute_margins(
    ph: Option<f64>,
    tds: Option<f64>,
    ntu: Option<f64>,
    cfg: &LabelConfig,
) -> Margins {
    let m_ph = match ph {
        Some(v) if cfg.ph_min <= v && v <= cfg.ph_max => {
            (v - cfg.ph_min).min(cfg.ph_max - v).clamp(0.0, 1.0)
        }
        _ => 0.0,
    };

    Margins {
        ph: m_ph,
        tds: headroom(tds, cfg.tds_clean_max),
        ntu: headroom(ntu, cfg.ntu_clean_max),
    }
}

fn headroom(value: Option<f64>, clean_max: f64) -> f64 {
    match value {
        Some(v) if v <= clean_max => ((clean_max - v) / clean_max.max(1.0)).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Label one reading. Pure: no I/O, no hidden state, never panics.
pub fn compute_label(
    ph: Option<f64>,
    tds: Option<f64>,
    turbidity: Option<f64>,
    config: &LabelConfig,
) -> LabelResult {
    let cfg = config;
    let mut violations: Vec<String> = Vec::new();

    let missing: Vec<&str> = [("ph", ph), ("tds", tds), ("ntu", turbidity)]
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| *name)
        .collect();

    if cfg.require_all_metrics && !missing.is_empty() {
        violations.push(format!("Missing metrics: {}", missing.join(", ")));
    }

    if let Some(v) = ph {
        if !(cfg.ph_min <= v && v <= cfg.ph_max) {
            let (which, bound) = if v < cfg.ph_min {
                ("<", cfg.ph_min)
            } else {
                (">", cfg.ph_max)
            };
            violations.push(format!("pH out of range: {v} ({which} {bound})"));
        }
    }

    // Negated comparisons so NaN lands in the "high" branch.
    if let Some(v) = turbidity {
        if !(v <= cfg.ntu_clean_max) {
            if v <= cfg.ntu_borderline_max {
                if cfg.strict {
                    violations.push(format!(
                        "Turbidity borderline: {v} NTU (> {})",
                        cfg.ntu_clean_max
                    ));
                }
            } else {
                violations.push(format!(
                    "Turbidity high: {v} NTU (> {})",
                    cfg.ntu_borderline_max
                ));
            }
        }
    }

    if let Some(v) = tds {
        if !(v <= cfg.tds_clean_max) {
            if v <= cfg.tds_borderline_max {
                if cfg.strict {
                    violations.push(format!(
                        "TDS borderline: {v} mg/L (> {})",
                        cfg.tds_clean_max
                    ));
                }
            } else {
                violations.push(format!(
                    "TDS high: {v} mg/L (> {})",
                    cfg.tds_borderline_max
                ));
            }
        }
    }

    let is_clean = violations.is_empty();
    let margins = compute_margins(ph, tds, turbidity, cfg);
    let confidence = if is_clean { margins.min() } else { 0.0 };

    let reasons = if is_clean {
        vec![format!(
            "Compliant: pH={}, TDS={} mg/L, NTU={}",
            fmt_opt(ph),
            fmt_opt(tds),
            fmt_opt(turbidity)
        )]
    } else {
        violations
    };

    LabelResult {
        label: if is_clean { Label::Clean } else { Label::Dirty },
        is_clean,
        reasons,
        confidence: round_to(confidence, 3),
        margins: margins.rounded(),
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => x.to_string(),
        None => "None".to_string(),
    }
}
