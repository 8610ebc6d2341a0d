//! # Sensor Sample
//! One probe reading: pH, total dissolved solids and turbidity.
//!
//! Every metric is optional. A probe that failed to report a value is not the
//! same as a probe that reported zero, so absence is carried as `None` all the
//! way into the engines.

use serde::{Deserialize, Serialize};

/// Conversion factor between TDS (ppm) and electrical conductivity.
pub const TDS_EC_K_FACTOR: f64 = 0.7;

/// A single reading from a water-quality probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    #[serde(default)]
    pub ph: Option<f64>,
    /// Total dissolved solids in mg/L (ppm).
    #[serde(default)]
    pub tds: Option<f64>,
    /// Turbidity in NTU. Accepts `ntu` as an alias since probes post it that way.
    #[serde(default, alias = "ntu")]
    pub turbidity: Option<f64>,
}

impl SensorSample {
    pub fn new(ph: Option<f64>, tds: Option<f64>, turbidity: Option<f64>) -> Self {
        Self { ph, tds, turbidity }
    }

    /// Convenience constructor when all three metrics are present.
    pub fn complete(ph: f64, tds: f64, turbidity: f64) -> Self {
        Self::new(Some(ph), Some(tds), Some(turbidity))
    }

    /// Electrical conductivity in mS/cm derived from TDS.
    pub fn ec_ms_cm(&self) -> f64 {
        tds_to_ec(self.tds)
    }

    /// Treat `NaN` readings as absent. Infinite values are kept; they compare
    /// past every threshold.
    pub fn without_nan(self) -> Self {
        let keep = |v: Option<f64>| v.filter(|x| !x.is_nan());
        Self {
            ph: keep(self.ph),
            tds: keep(self.tds),
            turbidity: keep(self.turbidity),
        }
    }
}

/// Convert TDS (ppm) to EC (mS/cm). Absent or non-positive TDS yields 0.
pub fn tds_to_ec(tds_ppm: Option<f64>) -> f64 {
    match tds_ppm {
        Some(v) if v > 0.0 => v / (TDS_EC_K_FACTOR * 1000.0),
        _ => 0.0,
    }
}

/// Round to `places` decimals (half away from zero).
pub(crate) fn round_to(x: f64, places: i32) -> f64 {
    let m = 10f64.powi(places);
    (x * m).round() / m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ec_from_tds() {
        assert!((tds_to_ec(Some(700.0)) - 1.0).abs() < 1e-12);
        assert_eq!(tds_to_ec(Some(0.0)), 0.0);
        assert_eq!(tds_to_ec(Some(-5.0)), 0.0);
        assert_eq!(tds_to_ec(None), 0.0);
    }

    #[test]
    fn deserializes_ntu_alias_and_missing_fields() {
        let s: SensorSample = serde_json::from_str(r#"{"ph":7.1,"ntu":0.4}"#).unwrap();
        assert_eq!(s.ph, Some(7.1));
        assert_eq!(s.turbidity, Some(0.4));
        assert_eq!(s.tds, None);
    }

    #[test]
    fn nan_becomes_absent() {
        let s = SensorSample::new(Some(f64::NAN), Some(f64::INFINITY), Some(0.5)).without_nan();
        assert_eq!(s.ph, None);
        assert_eq!(s.tds, Some(f64::INFINITY));
        assert_eq!(s.turbidity, Some(0.5));
    }

    #[test]
    fn rounding_helper() {
        assert_eq!(round_to(0.12345, 3), 0.123);
        assert_eq!(round_to(72.26, 1), 72.3);
    }
}
