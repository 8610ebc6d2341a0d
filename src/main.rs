//! Water Quality Service - Binary Entrypoint
//! Boots the Axum HTTP server with the rule labeler, the statistical predictor
//! and the measurement log wired from `config/water.toml`.

use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use water_quality::api::{create_router, AppState};
use water_quality::config::ServiceConfig;
use water_quality::metrics::Metrics;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - WATER_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("WATER_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("water_quality=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // Picks up WATER_CONFIG_PATH / WATER_MODEL_PATH / ... from .env.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = ServiceConfig::load_default()?;
    info!(
        model = %cfg.paths.model.display(),
        weights = %cfg.paths.weights.display(),
        log = %cfg.paths.measurement_log.display(),
        strict = cfg.label.strict,
        "service config loaded"
    );

    let metrics = Metrics::init()?;
    let state = AppState::from_config(&cfg)?;
    let router = create_router(state, &metrics);

    Ok(router.into())
}
