//! Randomized sweeps over the rule labeler plus the reference scenarios.
//! Seeded, so failures reproduce.

use rand::{rngs::StdRng, Rng, SeedableRng};

use water_quality::label::{compute_label, Label, LabelConfig};

const SEED: u64 = 0x5EED_2024;
const ROUNDS: usize = 2_000;

fn maybe(rng: &mut StdRng, lo: f64, hi: f64) -> Option<f64> {
    if rng.random_bool(0.15) {
        None
    } else {
        Some(rng.random_range(lo..hi))
    }
}

#[test]
fn ideal_zone_is_always_clean() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let cfg = LabelConfig::default();
    for _ in 0..ROUNDS {
        let ph = rng.random_range(6.5..=8.5);
        let tds = rng.random_range(0.0..=500.0);
        let ntu = rng.random_range(0.0..=1.0);
        let r = compute_label(Some(ph), Some(tds), Some(ntu), &cfg);
        assert!(r.is_clean, "ph={ph} tds={tds} ntu={ntu}: {:?}", r.reasons);
        assert_eq!(r.label, Label::Clean);
        assert_eq!(r.reasons.len(), 1);
        assert!(r.reasons[0].starts_with("Compliant: "));
    }
}

#[test]
fn confidence_and_margins_stay_in_unit_interval() {
    let mut rng = StdRng::seed_from_u64(SEED + 1);
    for strict in [true, false] {
        let cfg = LabelConfig::default().with_strict(strict);
        for _ in 0..ROUNDS {
            let ph = maybe(&mut rng, -2.0, 16.0);
            let tds = maybe(&mut rng, -100.0, 3000.0);
            let ntu = maybe(&mut rng, -1.0, 20.0);
            let r = compute_label(ph, tds, ntu, &cfg);
            for m in [r.margins.ph, r.margins.tds, r.margins.ntu, r.confidence] {
                assert!((0.0..=1.0).contains(&m), "{m} for {ph:?}/{tds:?}/{ntu:?}");
            }
            if !r.is_clean {
                assert_eq!(r.confidence, 0.0);
                assert!(!r.reasons.is_empty());
            }
            assert_eq!(r.is_clean, r.label == Label::Clean);
        }
    }
}

#[test]
fn any_missing_metric_is_dirty_when_required() {
    let mut rng = StdRng::seed_from_u64(SEED + 2);
    let cfg = LabelConfig::default();
    for _ in 0..ROUNDS {
        let mut vals = [
            Some(rng.random_range(6.5..=8.5)),
            Some(rng.random_range(0.0..=500.0)),
            Some(rng.random_range(0.0..=1.0)),
        ];
        vals[rng.random_range(0..3)] = None;
        let r = compute_label(vals[0], vals[1], vals[2], &cfg);
        assert!(!r.is_clean);
        assert_eq!(r.confidence, 0.0);
        assert!(r.reasons[0].starts_with("Missing metrics: "));
    }
}

#[test]
fn labeling_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(SEED + 3);
    let cfg = LabelConfig::default();
    for _ in 0..200 {
        let (ph, tds, ntu) = (
            maybe(&mut rng, 4.0, 10.0),
            maybe(&mut rng, 0.0, 1500.0),
            maybe(&mut rng, 0.0, 8.0),
        );
        assert_eq!(
            compute_label(ph, tds, ntu, &cfg),
            compute_label(ph, tds, ntu, &cfg)
        );
    }
}

#[test]
fn non_strict_never_dirtier_than_strict() {
    let mut rng = StdRng::seed_from_u64(SEED + 4);
    let strict = LabelConfig::default();
    let relaxed = strict.with_strict(false);
    for _ in 0..ROUNDS {
        let (ph, tds, ntu) = (
            maybe(&mut rng, 5.0, 10.0),
            maybe(&mut rng, 0.0, 1500.0),
            maybe(&mut rng, 0.0, 8.0),
        );
        if compute_label(ph, tds, ntu, &strict).is_clean {
            assert!(compute_label(ph, tds, ntu, &relaxed).is_clean);
        }
    }
}

#[test]
fn reference_clean_reading() {
    let r = compute_label(Some(7.2), Some(450.0), Some(0.8), &LabelConfig::default());
    assert_eq!(r.label, Label::Clean);
    assert_eq!(r.reasons, vec!["Compliant: pH=7.2, TDS=450 mg/L, NTU=0.8"]);
    assert!(r.confidence > 0.0);
}

#[test]
fn reference_dirty_reading() {
    let r = compute_label(Some(9.2), Some(1200.0), Some(6.0), &LabelConfig::default());
    assert_eq!(r.label, Label::Dirty);
    assert_eq!(r.confidence, 0.0);
    assert_eq!(
        r.reasons,
        vec![
            "pH out of range: 9.2 (> 8.5)",
            "Turbidity high: 6 NTU (> 5)",
            "TDS high: 1200 mg/L (> 1000)",
        ]
    );
}

#[test]
fn all_missing_lists_every_metric() {
    let r = compute_label(None, None, None, &LabelConfig::default());
    assert!(!r.is_clean);
    assert_eq!(r.confidence, 0.0);
    assert_eq!(r.reasons, vec!["Missing metrics: ph, tds, ntu"]);
}

#[test]
fn bounds_are_inclusive() {
    let cfg = LabelConfig::default();
    assert!(compute_label(Some(6.5), Some(500.0), Some(1.0), &cfg).is_clean);
    assert!(compute_label(Some(8.5), Some(0.0), Some(0.0), &cfg).is_clean);
    assert!(!compute_label(Some(8.51), Some(0.0), Some(0.0), &cfg).is_clean);
}
