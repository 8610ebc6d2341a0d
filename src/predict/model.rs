//! Pretrained binary classifier over (pH, turbidity).
//!
//! The artifact is a JSON document exported from the training notebook:
//!
//! ```json
//! { "kind": "logistic", "features": ["ph", "Turbidity"],
//!   "means": [7.08, 3.97], "scales": [1.59, 0.78],
//!   "coefficients": [-0.21, -0.93], "intercept": 0.35 }
//! ```
//!
//! or a forest of decision trees whose leaves hold per-class sample counts:
//!
//! ```json
//! { "kind": "forest", "features": ["ph", "Turbidity"],
//!   "trees": [ { "nodes": [
//!     { "feature": 1, "threshold": 4.0, "left": 1, "right": 2 },
//!     { "value": [3, 40] },
//!     { "value": [25, 2] } ] } ] }
//! ```
//!
//! Splits send `x <= threshold` left. Class 1 means "safe".

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures inside the predictor. Never leaves [`super::Predictor::predict`];
/// every variant degrades to the fallback heuristic there.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("reading model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing model artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing input for model feature `{0}`")]
    MissingInput(&'static str),

    #[error("unknown model feature `{0}`")]
    UnknownFeature(String),

    #[error("malformed model: {0}")]
    Shape(String),

    #[error("model produced non-finite probabilities")]
    NonFinite,
}

/// Model inputs. Both values are required by every classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInput {
    pub ph: f64,
    pub turbidity: f64,
}

impl ModelInput {
    pub fn new(ph: Option<f64>, turbidity: Option<f64>) -> Result<Self, ModelError> {
        Ok(Self {
            ph: ph.ok_or(ModelError::MissingInput("ph"))?,
            turbidity: turbidity.ok_or(ModelError::MissingInput("Turbidity"))?,
        })
    }

    /// Look up a value by training column name.
    pub fn feature(&self, name: &str) -> Result<f64, ModelError> {
        match name.to_ascii_lowercase().as_str() {
            "ph" => Ok(self.ph),
            "turbidity" | "ntu" => Ok(self.turbidity),
            _ => Err(ModelError::UnknownFeature(name.to_string())),
        }
    }
}

/// Anything that yields `[P(unsafe), P(safe)]` for a reading.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, input: &ModelInput) -> Result<[f64; 2], ModelError>;

    /// Short backend name for status output.
    fn kind(&self) -> &'static str;
}

/// Class index with the highest probability. Ties go to class 0.
pub fn argmax(proba: [f64; 2]) -> u8 {
    if proba[1] > proba[0] {
        1
    } else {
        0
    }
}

// ------------------------------------------------------------
// Artifact formats
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Logistic(LogisticModel),
    Forest(ForestModel),
}

/// Logistic regression with optional standardization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub features: Vec<String>,
    #[serde(default)]
    pub means: Option<Vec<f64>>,
    #[serde(default)]
    pub scales: Option<Vec<f64>>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    pub features: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

/// Flat node array; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

impl ModelArtifact {
    /// Structural checks, so inference can only fail on inputs.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::Logistic(m) => m.validate(),
            Self::Forest(m) => m.validate(),
        }
    }
}

fn check_features(features: &[String]) -> Result<(), ModelError> {
    if features.is_empty() {
        return Err(ModelError::Shape("no features".into()));
    }
    // A dummy input resolves every name the model may ask for.
    let probe = ModelInput {
        ph: 0.0,
        turbidity: 0.0,
    };
    for f in features {
        probe.feature(f)?;
    }
    Ok(())
}

impl LogisticModel {
    fn validate(&self) -> Result<(), ModelError> {
        check_features(&self.features)?;
        let n = self.features.len();
        if self.coefficients.len() != n {
            return Err(ModelError::Shape(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                n
            )));
        }
        for (name, v) in [("means", &self.means), ("scales", &self.scales)] {
            if let Some(v) = v {
                if v.len() != n {
                    return Err(ModelError::Shape(format!(
                        "{name} has {} entries for {n} features",
                        v.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl ForestModel {
    fn validate(&self) -> Result<(), ModelError> {
        check_features(&self.features)?;
        if self.trees.is_empty() {
            return Err(ModelError::Shape("forest has no trees".into()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::Shape(format!("tree {t} has no nodes")));
            }
            for node in &tree.nodes {
                match node {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= self.features.len() {
                            return Err(ModelError::Shape(format!(
                                "tree {t} splits on feature index {feature}"
                            )));
                        }
                        if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                            return Err(ModelError::Shape(format!(
                                "tree {t} has a child index out of range"
                            )));
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != 2 {
                            return Err(ModelError::Shape(format!(
                                "tree {t} has a leaf with {} classes",
                                value.len()
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl DecisionTree {
    /// Normalized class distribution of the leaf reached by `x`.
    fn leaf_distribution(&self, x: &[f64]) -> Result<[f64; 2], ModelError> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in fewer hops than it has nodes.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = x
                        .get(*feature)
                        .ok_or_else(|| ModelError::Shape("split feature out of range".into()))?;
                    idx = if *v <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => {
                    let (c0, c1) = match value.as_slice() {
                        [c0, c1] => (*c0, *c1),
                        _ => return Err(ModelError::Shape("leaf is not binary".into())),
                    };
                    let total = c0 + c1;
                    if total <= 0.0 {
                        return Err(ModelError::Shape("empty leaf".into()));
                    }
                    return Ok([c0 / total, c1 / total]);
                }
                None => return Err(ModelError::Shape("child index out of range".into())),
            }
        }
        Err(ModelError::Shape("tree contains a cycle".into()))
    }
}

fn feature_vector(features: &[String], input: &ModelInput) -> Result<Vec<f64>, ModelError> {
    features.iter().map(|f| input.feature(f)).collect()
}

impl Classifier for LogisticModel {
    fn predict_proba(&self, input: &ModelInput) -> Result<[f64; 2], ModelError> {
        let x = feature_vector(&self.features, input)?;
        let mut z = self.intercept;
        for (i, (xi, coef)) in x.iter().zip(&self.coefficients).enumerate() {
            let mean = self.means.as_ref().and_then(|m| m.get(i)).copied().unwrap_or(0.0);
            let scale = self
                .scales
                .as_ref()
                .and_then(|s| s.get(i))
                .copied()
                .filter(|s| *s != 0.0)
                .unwrap_or(1.0);
            z += coef * (xi - mean) / scale;
        }
        let p1 = 1.0 / (1.0 + (-z).exp());
        Ok([1.0 - p1, p1])
    }

    fn kind(&self) -> &'static str {
        "logistic"
    }
}

impl Classifier for ForestModel {
    fn predict_proba(&self, input: &ModelInput) -> Result<[f64; 2], ModelError> {
        let x = feature_vector(&self.features, input)?;
        let mut acc = [0.0, 0.0];
        for tree in &self.trees {
            let [p0, p1] = tree.leaf_distribution(&x)?;
            acc[0] += p0;
            acc[1] += p1;
        }
        let n = self.trees.len() as f64;
        Ok([acc[0] / n, acc[1] / n])
    }

    fn kind(&self) -> &'static str {
        "forest"
    }
}

impl Classifier for ModelArtifact {
    fn predict_proba(&self, input: &ModelInput) -> Result<[f64; 2], ModelError> {
        match self {
            Self::Logistic(m) => m.predict_proba(input),
            Self::Forest(m) => m.predict_proba(input),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Logistic(m) => m.kind(),
            Self::Forest(m) => m.kind(),
        }
    }
}

/// Read, parse and validate an artifact.
pub fn load_model(path: &Path) -> Result<ModelArtifact, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: ModelArtifact =
        serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    artifact.validate()?;
    Ok(artifact)
}
