//! Threshold checks that bracket the model: hard overrides before inference,
//! the secondary danger check after it, and the tier/recommendation rules.
//!
//! All checks skip absent metrics.

use crate::sample::SensorSample;

use super::result::RiskLevel;

pub const DANGER_NOTICE: &str = "DANGER - DO NOT USE";
pub const UNSAFE_SUMMARY: &str = "UNSAFE - further treatment required";
pub const SAFE_SUMMARY: &str = "SAFE TO USE";

/// Reasons that bypass the model entirely. Empty when the reading is not extreme.
pub fn critical_reasons(sample: &SensorSample) -> Vec<&'static str> {
    let mut out = Vec::new();
    if let Some(ph) = sample.ph {
        if ph < 5.0 || ph > 9.0 {
            out.push("Extreme pH - dangerous");
        }
    }
    if sample.turbidity.is_some_and(|t| t > 10.0) {
        out.push("Extremely high turbidity - unsafe");
    }
    if sample.tds.is_some_and(|t| t > 2000.0) {
        out.push("TDS too high - not drinkable");
    }
    out
}

/// Independent danger signals checked when the model says "safe".
pub fn danger_signals(sample: &SensorSample) -> Vec<&'static str> {
    let mut out = Vec::new();
    if let Some(ph) = sample.ph {
        if ph < 6.0 || ph > 9.0 {
            out.push("pH outside safe limits");
        }
    }
    if sample.turbidity.is_some_and(|t| t > 5.0) {
        out.push("Turbidity too high");
    }
    if sample.tds.is_some_and(|t| t < 10.0) {
        out.push("TDS abnormally low");
    }
    out
}

/// Number of signals that flip a "safe" model verdict.
pub const SECONDARY_OVERRIDE_MIN_SIGNALS: usize = 2;
/// Ceiling on the safe probability after a secondary override.
pub const SECONDARY_OVERRIDE_CAP: f64 = 25.0;

/// Count of risk factors: pH outside `[6.5, 8.5]`, turbidity above 1 and
/// (again) above 4 NTU, EC outside `[0.3, 1.5]` mS/cm.
pub fn risk_factor_count(sample: &SensorSample, ec_ms_cm: f64) -> u8 {
    let mut n = 0;
    if sample.ph.is_some_and(|ph| !(6.5..=8.5).contains(&ph)) {
        n += 1;
    }
    if let Some(t) = sample.turbidity {
        if t > 1.0 {
            n += 1;
        }
        if t > 4.0 {
            n += 1;
        }
    }
    if ec_ms_cm > 1.5 || ec_ms_cm < 0.3 {
        n += 1;
    }
    n
}

pub fn risk_level(sample: &SensorSample, ec_ms_cm: f64) -> RiskLevel {
    RiskLevel::from_factor_count(risk_factor_count(sample, ec_ms_cm))
}

/// Operator advice, always ending with the overall verdict.
pub fn recommendations(sample: &SensorSample, ec_ms_cm: f64, is_safe: bool) -> Vec<String> {
    let mut out = Vec::new();
    match sample.ph {
        Some(ph) if ph < 6.5 => out.push("pH too low - raise pH"),
        Some(ph) if ph > 8.5 => out.push("pH too high - lower pH"),
        _ => {}
    }
    if let Some(t) = sample.turbidity {
        if t > 1.0 {
            out.push("High turbidity - filtration needed");
        }
        if t > 4.0 {
            out.push("Very high turbidity - do not use");
        }
    }
    if ec_ms_cm > 1.5 {
        out.push("High EC - water is rich in dissolved minerals");
    } else if ec_ms_cm < 0.3 {
        out.push("Low EC - water is unusually pure");
    }
    out.push(if is_safe { SAFE_SUMMARY } else { UNSAFE_SUMMARY });
    out.into_iter().map(String::from).collect()
}
