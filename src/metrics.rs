use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::label::LabelResult;
use crate::predict::PredictionResult;

pub const PREDICTIONS_TOTAL: &str = "water_predictions_total";
pub const LABELS_TOTAL: &str = "water_labels_total";

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        Ok(Self { handle })
    }

    /// Recorder that is not installed globally; renders empty output.
    /// Lets tests build routers without fighting over the global recorder.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self {
            handle: recorder.handle(),
        }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// Count one prediction under its path label (`primary_model`, `fallback`, ...).
pub fn record_prediction(result: &PredictionResult) {
    counter!(PREDICTIONS_TOTAL, "path" => result.model_version.path()).increment(1);
}

pub fn record_label(result: &LabelResult) {
    counter!(LABELS_TOTAL, "label" => result.label.as_str()).increment(1);
}
