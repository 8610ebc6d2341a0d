//! Weighted risk adjustment applied on top of the model probability.
//!
//! Each metric gets a deviation in `[0,1]` (0 inside its ideal band, 1 at or
//! beyond the worst bound). The weighted sum is the risk score; the safe
//! probability is then scaled by `factor = 1 - (1 - MIN_FACTOR) * risk_score`.

use std::collections::BTreeMap;

use super::result::PostWeighting;
use super::weights::{Feature, FeatureWeights};
use crate::sample::{round_to, SensorSample};

/// Factor applied at maximal risk.
pub const MIN_FACTOR: f64 = 0.6;

/// Per-metric deviation from the ideal band, each in `[0,1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Deviations {
    pub ph: f64,
    pub turbidity: f64,
    pub solids: f64,
}

impl Deviations {
    /// Absent metrics deviate 0.
    pub fn from_sample(sample: &SensorSample) -> Self {
        Self {
            ph: sample.ph.map(ph_deviation).unwrap_or(0.0),
            turbidity: sample.turbidity.map(turbidity_deviation).unwrap_or(0.0),
            solids: sample.tds.map(tds_deviation).unwrap_or(0.0),
        }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Ph => self.ph,
            Feature::Turbidity => self.turbidity,
            Feature::Solids => self.solids,
        }
    }
}

/// 0 in `[6.5, 8.5]`, reaching 1 at 5.0 below and 9.0 above.
fn ph_deviation(ph: f64) -> f64 {
    if (6.5..=8.5).contains(&ph) {
        0.0
    } else if ph < 6.5 {
        ((6.5 - ph) / (6.5 - 5.0)).min(1.0)
    } else {
        ((ph - 8.5) / (9.0 - 8.5)).min(1.0)
    }
}

/// 0 up to 1 NTU, linear to 1 at 5 NTU.
fn turbidity_deviation(ntu: f64) -> f64 {
    ((ntu - 1.0) / (5.0 - 1.0)).clamp(0.0, 1.0)
}

/// 0 in `[50, 1000]` mg/L, reaching 1 at 0 and at 2000.
fn tds_deviation(tds: f64) -> f64 {
    if (50.0..=1000.0).contains(&tds) {
        0.0
    } else if tds < 50.0 {
        ((50.0 - tds) / 50.0).min(1.0)
    } else {
        ((tds - 1000.0) / 1000.0).min(1.0)
    }
}

/// Outcome of the weighted adjustment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedAdjustment {
    /// Multiplier in `[MIN_FACTOR, 1]`.
    pub factor: f64,
    /// Weighted deviation in `[0,1]`.
    pub risk_score: f64,
    pub deviations: Deviations,
}

impl WeightedAdjustment {
    /// Scale a safe probability (percent), clamped to `[0,100]` and rounded to 1 decimal.
    pub fn apply(&self, safe_probability: f64) -> f64 {
        round_to((safe_probability * self.factor).clamp(0.0, 100.0), 1)
    }

    /// Diagnostics block attached to primary-path results.
    pub fn to_post_weighting(&self, weights: &FeatureWeights) -> PostWeighting {
        let deviations: BTreeMap<String, f64> = Feature::ALL
            .iter()
            .map(|f| (f.name().to_string(), round_to(self.deviations.get(*f), 3)))
            .collect();
        PostWeighting {
            factor: round_to(self.factor, 3),
            risk_score: round_to(self.risk_score, 3),
            deviations,
            weights_used: weights.as_map(),
        }
    }
}

/// Compute the multiplicative factor for `sample` under `weights`.
pub fn weighted_factor(sample: &SensorSample, weights: &FeatureWeights) -> WeightedAdjustment {
    let deviations = Deviations::from_sample(sample);
    let raw: f64 = Feature::ALL
        .iter()
        .map(|f| weights.get(*f) * deviations.get(*f))
        .sum();
    let risk_score = raw.clamp(0.0, 1.0);
    let factor = (1.0 - (1.0 - MIN_FACTOR) * risk_score).clamp(MIN_FACTOR, 1.0);
    WeightedAdjustment {
        factor,
        risk_score,
        deviations,
    }
}
