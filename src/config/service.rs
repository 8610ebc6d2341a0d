// src/config/service.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::label::LabelConfig;

pub const ENV_CONFIG_PATH: &str = "WATER_CONFIG_PATH";
pub const ENV_MODEL_PATH: &str = "WATER_MODEL_PATH";
pub const ENV_WEIGHTS_PATH: &str = "WATER_WEIGHTS_PATH";
pub const ENV_LOG_PATH: &str = "WATER_LOG_PATH";

const DEFAULT_CONFIG_PATH: &str = "config/water.toml";

fn default_model_path() -> PathBuf {
    PathBuf::from("models/water_quality_ph_ntu.json")
}
fn default_weights_path() -> PathBuf {
    PathBuf::from("models/feature_weights_alpha0.7.csv")
}
fn default_log_path() -> PathBuf {
    PathBuf::from("logs/measurements.csv")
}

/// Artifact locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_model_path")]
    pub model: PathBuf,
    #[serde(default = "default_weights_path")]
    pub weights: PathBuf,
    #[serde(default = "default_log_path")]
    pub measurement_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            model: default_model_path(),
            weights: default_weights_path(),
            measurement_log: default_log_path(),
        }
    }
}

/// Service configuration, `config/water.toml`:
///
/// ```toml
/// [paths]
/// model = "models/water_quality_ph_ntu.json"
/// weights = "models/feature_weights_alpha0.7.csv"
/// measurement_log = "logs/measurements.csv"
///
/// [label]
/// strict = true
/// tds_clean_max = 500.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub label: LabelConfig,
}

impl ServiceConfig {
    /// Parse a TOML (or, by extension, JSON) config file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg: ServiceConfig = if ext == "json" {
            serde_json::from_str(&data)
                .with_context(|| format!("parsing JSON config {}", path.display()))?
        } else {
            toml::from_str(&data)
                .with_context(|| format!("parsing TOML config {}", path.display()))?
        };
        cfg.label = cfg.label.sanitized();
        Ok(cfg)
    }

    /// Resolve the config:
    /// 1) `$WATER_CONFIG_PATH` (must exist)
    /// 2) `config/water.toml`
    /// 3) built-in defaults
    ///
    /// Path env overrides are applied last in every case.
    pub fn load_default() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!(
                        "{ENV_CONFIG_PATH} points to non-existent path {}",
                        pb.display()
                    ));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let p = Path::new(DEFAULT_CONFIG_PATH);
                if p.exists() {
                    Self::load_from_file(p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        let var = |k: &str| {
            std::env::var(k)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };
        if let Some(p) = var(ENV_MODEL_PATH) {
            self.paths.model = p;
        }
        if let Some(p) = var(ENV_WEIGHTS_PATH) {
            self.paths.weights = p;
        }
        if let Some(p) = var(ENV_LOG_PATH) {
            self.paths.measurement_log = p;
        }
    }
}
