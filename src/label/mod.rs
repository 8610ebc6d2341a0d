// src/label/mod.rs
//! Rule-based labeling: strict WHO thresholds, configuration, and batch
//! relabeling of CSV datasets.

pub mod config;
pub mod dataset;
pub mod rules;

pub use config::LabelConfig;
pub use dataset::{label_csv, LabelSummary};
pub use rules::{compute_label, compute_margins, Label, LabelResult, Margins};

use crate::sample::SensorSample;

/// Label a [`SensorSample`] directly.
pub fn label_sample(sample: &SensorSample, cfg: &LabelConfig) -> LabelResult {
    compute_label(sample.ph, sample.tds, sample.turbidity, cfg)
}
