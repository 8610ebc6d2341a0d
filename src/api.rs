use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::alert::Alert;
use crate::config::ServiceConfig;
use crate::label::{label_sample, LabelConfig, LabelResult};
use crate::logger::{LogStats, MeasurementLogger};
use crate::metrics::{self, Metrics};
use crate::predict::{strict_who_prediction, PredictionResult, Predictor, PredictorStatus};
use crate::sample::SensorSample;

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub label_cfg: LabelConfig,
    /// `None` disables the measurement log (readings are still evaluated).
    pub logger: Option<Arc<MeasurementLogger>>,
}

impl AppState {
    /// Wire the engines from config. Weights load now, the model on first use.
    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let predictor = Predictor::from_paths(&cfg.paths.model, &cfg.paths.weights);
        let logger = MeasurementLogger::open(&cfg.paths.measurement_log)?;
        Ok(Self {
            predictor: Arc::new(predictor),
            label_cfg: cfg.label,
            logger: Some(Arc::new(logger)),
        })
    }
}

pub fn create_router(state: AppState, metrics: &Metrics) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/label", post(label))
        .route("/predict", post(predict))
        .route("/predict/strict", post(predict_strict))
        .route("/readings", post(submit_reading))
        .route("/status", get(status))
        .with_state(state)
        .merge(metrics.router())
        .layer(CorsLayer::very_permissive())
}

#[derive(serde::Deserialize)]
struct LabelReq {
    #[serde(default)]
    ph: Option<f64>,
    #[serde(default)]
    tds: Option<f64>,
    #[serde(default, alias = "ntu")]
    turbidity: Option<f64>,
    /// Per-request override of the borderline policy.
    #[serde(default)]
    strict: Option<bool>,
}

async fn label(State(state): State<AppState>, Json(body): Json<LabelReq>) -> Json<LabelResult> {
    let cfg = match body.strict {
        Some(strict) => state.label_cfg.with_strict(strict),
        None => state.label_cfg,
    };
    let sample = SensorSample::new(body.ph, body.tds, body.turbidity);
    let res = label_sample(&sample, &cfg);
    metrics::record_label(&res);
    Json(res)
}

async fn predict(
    State(state): State<AppState>,
    Json(sample): Json<SensorSample>,
) -> Json<PredictionResult> {
    Json(state.predictor.predict_sample(&sample))
}

async fn predict_strict(
    State(state): State<AppState>,
    Json(sample): Json<SensorSample>,
) -> Json<PredictionResult> {
    let res = strict_who_prediction(&sample, &state.label_cfg);
    metrics::record_prediction(&res);
    Json(res)
}

#[derive(serde::Serialize)]
struct ReadingResp {
    result: PredictionResult,
    alert: Option<Alert>,
    /// Whether the reading made it into the measurement log.
    logged: bool,
}

async fn submit_reading(
    State(state): State<AppState>,
    Json(sample): Json<SensorSample>,
) -> Json<ReadingResp> {
    let result = state.predictor.predict_sample(&sample);

    let logged = match &state.logger {
        Some(log) => {
            match log.log_measurement(sample.ph, sample.tds, sample.turbidity, result.is_safe) {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, "failed to log measurement");
                    false
                }
            }
        }
        None => false,
    };

    let alert = Alert::from_prediction(&result);
    if let Some(a) = &alert {
        warn!(severity = a.severity.as_str(), message = %a.message, "alert raised");
    }

    Json(ReadingResp {
        result,
        alert,
        logged,
    })
}

#[derive(serde::Serialize)]
struct StatusResp {
    predictor: PredictorStatus,
    label: LabelConfig,
    measurement_log: Option<LogStats>,
}

async fn status(State(state): State<AppState>) -> Json<StatusResp> {
    let measurement_log = state.logger.as_ref().and_then(|l| match l.stats() {
        Ok(s) => Some(s),
        Err(e) => {
            error!(error = %e, "failed to read measurement log stats");
            None
        }
    });
    Json(StatusResp {
        predictor: state.predictor.status(),
        label: state.label_cfg,
        measurement_log,
    })
}
