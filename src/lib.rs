// src/lib.rs
// Public library surface for the service binary, the CLI and integration tests.

pub mod sample;

// Engines
pub mod label;
pub mod predict;

// Service plumbing
pub mod alert;
pub mod api;
pub mod config;
pub mod logger;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::label::{compute_label, LabelConfig, LabelResult};
pub use crate::predict::{PredictionResult, Predictor};
pub use crate::sample::SensorSample;
