// tests/predictor_pipeline.rs
//
// End-to-end behavior of the statistical predictor: overrides, weighted
// adjustment, secondary override, fallback, and the two artifact formats.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use water_quality::predict::{
    Classifier, DynClassifier, FeatureWeights, ModelError, ModelInput, ModelVersion, Predictor,
    QualityLevel, RiskLevel,
};

/// Classifier double returning a fixed P(safe).
struct Always(f64);

impl Classifier for Always {
    fn predict_proba(&self, _: &ModelInput) -> Result<[f64; 2], ModelError> {
        Ok([1.0 - self.0, self.0])
    }
    fn kind(&self) -> &'static str {
        "always"
    }
}

fn with_model(p_safe: f64) -> Predictor {
    Predictor::with_classifier(Arc::new(Always(p_safe)), FeatureWeights::defaults())
}

fn assert_sums_to_100(safe: f64, risk: f64) {
    assert_eq!(safe + risk, 100.0, "{safe} + {risk}");
}

#[test]
fn extreme_ph_triggers_safety_override() {
    let r = with_model(0.99).predict(Some(4.0), Some(0.5), Some(300.0));
    assert_eq!(r.model_version, ModelVersion::SafetyOverride);
    assert!(!r.is_safe);
    assert_eq!(r.prediction, 0);
    assert_eq!((r.safe_probability, r.risk_probability), (5.0, 95.0));
    assert_eq!(r.quality_level, QualityLevel::VeryPoor);
    assert_eq!(r.risk_level, RiskLevel::High);
    assert_eq!(
        r.recommendations,
        vec!["Extreme pH - dangerous", "DANGER - DO NOT USE"]
    );
    assert!(r.post_weighting.is_none());
}

#[test]
fn every_critical_condition_is_listed() {
    let r = with_model(0.5).predict(Some(9.5), Some(15.0), Some(2500.0));
    assert_eq!(r.model_version, ModelVersion::SafetyOverride);
    assert_eq!(r.recommendations.len(), 4);
}

#[test]
fn ideal_reading_uses_primary_model() {
    let r = with_model(0.87).predict(Some(7.0), Some(0.5), Some(300.0));
    assert_eq!(r.model_version, ModelVersion::PhNtu);
    assert!(r.is_safe);
    assert_sums_to_100(r.safe_probability, r.risk_probability);
    let pw = r.post_weighting.expect("post_weighting on primary path");
    assert!((0.6..=1.0).contains(&pw.factor));
    assert_eq!(r.safe_probability, 87.0);
    assert_eq!(r.risk_level, RiskLevel::Low);
    assert_eq!(r.recommendations, vec!["SAFE TO USE"]);
    assert!((r.input_data.ec_ms_cm - 0.429).abs() < 1e-12);
}

#[test]
fn deviations_shrink_safe_probability() {
    // pH 6.0 deviates 1/3, turbidity 3.0 deviates 1/2, TDS 1500 deviates 1/2.
    let w = FeatureWeights::normalized(1.0, 1.0, 1.0);
    let p = Predictor::with_classifier(Arc::new(Always(0.8)), w);
    let r = p.predict(Some(6.0), Some(3.0), Some(1500.0));
    let pw = r.post_weighting.as_ref().unwrap();
    let expected_risk = (1.0 / 3.0 + 0.5 + 0.5) / 3.0;
    assert!((pw.risk_score - expected_risk).abs() < 1e-3);
    let expected_factor = 1.0 - 0.4 * expected_risk;
    assert!((r.safe_probability - 80.0 * expected_factor).abs() <= 0.05 + 1e-9);
    assert_sums_to_100(r.safe_probability, r.risk_probability);
}

#[test]
fn two_danger_signals_override_a_safe_verdict() {
    let r = with_model(0.95).predict(Some(5.5), Some(6.0), Some(300.0));
    assert_eq!(r.model_version, ModelVersion::PhNtu);
    assert_eq!(r.prediction, 0);
    assert!(!r.is_safe);
    assert!(r.safe_probability <= 25.0);
    assert_sums_to_100(r.safe_probability, r.risk_probability);
    assert_eq!(r.recommendations.last().unwrap(), "UNSAFE - further treatment required");
}

#[test]
fn one_danger_signal_keeps_the_verdict() {
    let r = with_model(0.95).predict(Some(7.0), Some(6.0), Some(300.0));
    assert_eq!(r.prediction, 1);
    assert!(r.is_safe);
}

#[test]
fn weighting_can_leave_safe_verdict_below_fifty() {
    // The verdict follows the raw model; weighting only moves the probability.
    let w = FeatureWeights::normalized(0.0, 1.0, 0.0);
    let p = Predictor::with_classifier(Arc::new(Always(0.6)), w);
    let r = p.predict(Some(7.0), Some(5.0), Some(300.0));
    assert!(r.is_safe);
    assert_eq!(r.safe_probability, 36.0);
    assert_eq!(r.quality_level, QualityLevel::Poor);
}

#[test]
fn missing_model_degrades_to_fallback() {
    let tmp = TempDir::new().unwrap();
    let p = Predictor::new(tmp.path().join("absent.json"), FeatureWeights::defaults());

    let r = p.predict(Some(7.0), Some(0.5), Some(300.0));
    assert_eq!(r.model_version, ModelVersion::Fallback);
    assert!(r.is_safe);
    assert_eq!(r.safe_probability, 75.0);
    assert_eq!(r.recommendations, vec!["Quality acceptable"]);

    let r = p.predict(Some(7.0), Some(4.5), Some(20.0));
    assert!(!r.is_safe);
    assert_eq!(
        r.recommendations,
        vec!["Turbidity too high", "TDS outside limits"]
    );

    // Overrides do not need the model.
    let r = p.predict(Some(7.0), Some(11.0), Some(300.0));
    assert_eq!(r.model_version, ModelVersion::SafetyOverride);
}

#[test]
fn model_appearing_later_is_picked_up() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("model.json");
    let p = Predictor::new(&path, FeatureWeights::defaults());
    assert_eq!(
        p.predict(Some(7.0), Some(0.5), Some(300.0)).model_version,
        ModelVersion::Fallback
    );

    std::fs::write(
        &path,
        r#"{"kind":"logistic","features":["ph","Turbidity"],
            "coefficients":[0.0,-2.0],"intercept":3.0}"#,
    )
    .unwrap();
    let r = p.predict(Some(7.0), Some(0.5), Some(300.0));
    assert_eq!(r.model_version, ModelVersion::PhNtu);
    assert!(p.is_loaded());
    assert_eq!(p.status().model_kind, Some("logistic"));
}

#[test]
fn concurrent_first_calls_share_one_load() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let p = Predictor::with_loader(
        Box::new(move || -> Result<DynClassifier, ModelError> {
            counter.fetch_add(1, Ordering::SeqCst);
            // Hold the load open so the other threads pile up behind it.
            thread::sleep(Duration::from_millis(50));
            Ok(Arc::new(Always(0.87)))
        }),
        FeatureWeights::defaults(),
    );
    assert!(!p.is_loaded());

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| p.predict(Some(7.0), Some(0.5), Some(300.0))))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(p.is_loaded());
    assert_eq!(p.status().model_kind, Some("always"));
    for r in &results {
        assert_eq!(r.model_version, ModelVersion::PhNtu);
        assert_eq!(r.safe_probability, 87.0);
    }
}

#[test]
fn concurrent_first_calls_on_artifact_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("model.json");
    std::fs::write(
        &path,
        r#"{"kind":"logistic","features":["ph","Turbidity"],
            "coefficients":[0.0,-2.0],"intercept":3.0}"#,
    )
    .unwrap();
    let p = Predictor::new(&path, FeatureWeights::defaults());

    let versions: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| p.predict(Some(7.0), Some(0.5), Some(300.0)).model_version))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(versions.iter().all(|v| *v == ModelVersion::PhNtu));
    assert_eq!(p.status().model_kind, Some("logistic"));
}

#[test]
fn forest_artifact_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("forest.json");
    std::fs::write(
        &path,
        r#"{"kind":"forest","features":["ph","Turbidity"],"trees":[
            {"nodes":[{"feature":0,"threshold":6.5,"left":1,"right":2},
                      {"value":[30,10]},{"value":[5,45]}]},
            {"nodes":[{"feature":1,"threshold":2.0,"left":1,"right":2},
                      {"value":[2,18]},{"value":[16,4]}]}]}"#,
    )
    .unwrap();
    let p = Predictor::new(&path, FeatureWeights::defaults());

    // Both trees vote safe: (0.9 + 0.9) / 2.
    let r = p.predict(Some(7.2), Some(0.8), Some(400.0));
    assert_eq!(r.safe_probability, 90.0);
    assert_eq!(r.quality_level, QualityLevel::Excellent);

    // Second tree votes unsafe: (0.9 + 0.2) / 2 = 0.55 before weighting.
    let r = p.predict(Some(7.2), Some(3.0), Some(400.0));
    assert!(r.is_safe);
    assert!(r.safe_probability < 55.0);
}

#[test]
fn malformed_artifact_degrades_to_fallback() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let p = Predictor::new(&path, FeatureWeights::defaults());
    let r = p.predict(Some(7.0), Some(0.5), Some(300.0));
    assert_eq!(r.model_version, ModelVersion::Fallback);
    assert!(!p.is_loaded());
    assert!(p.status().model_exists);
}

#[test]
fn absent_inputs_never_panic() {
    let p = with_model(0.9);
    for (ph, ntu, tds) in [
        (None, None, None),
        (Some(7.0), None, None),
        (None, Some(0.5), Some(300.0)),
        (Some(f64::NAN), Some(0.5), Some(300.0)),
    ] {
        let r = p.predict(ph, ntu, tds);
        assert_eq!(r.model_version, ModelVersion::Fallback);
        assert!(!r.is_safe);
    }

    // TDS is only used for weighting; the model still runs without it.
    let r = p.predict(Some(7.0), Some(0.5), None);
    assert_eq!(r.model_version, ModelVersion::PhNtu);
    assert_eq!(r.input_data.ec_ms_cm, 0.0);
}
