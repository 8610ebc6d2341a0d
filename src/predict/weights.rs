//! Feature-importance weights for the post-model risk adjustment.
//!
//! Accepted sources (picked by file extension):
//!
//! CSV, as produced by the feature-importance export:
//! ```text
//! Thong_so,Weight
//! ph,0.180607
//! Turbidity,0.160564
//! Solids,0.419466
//! ```
//! (`feature,weight` headers are accepted too.)
//!
//! JSON, either `{"ph": 0.2, "Turbidity": 0.2, "Solids": 0.6}` or
//! `[{"feature": "ph", "weight": 0.2}, ...]`.
//!
//! Only `ph`, `Turbidity` and `Solids` are kept; the three are normalized to sum
//! to 1. Loading never fails: a missing file or a broken one yields a fixed
//! default triple.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Features the risk adjustment understands, named as in the training dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Ph,
    Turbidity,
    Solids,
}

impl Feature {
    pub const ALL: [Feature; 3] = [Feature::Ph, Feature::Turbidity, Feature::Solids];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ph => "ph",
            Self::Turbidity => "Turbidity",
            Self::Solids => "Solids",
        }
    }
}

/// Normalized weights; `ph + turbidity + solids == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeights {
    pub ph: f64,
    #[serde(rename = "Turbidity")]
    pub turbidity: f64,
    #[serde(rename = "Solids")]
    pub solids: f64,
}

/// Used when no weights file exists (values from the last importance run).
const DEFAULT_WEIGHTS: (f64, f64, f64) = (0.180607, 0.160564, 0.419466);
/// Used when a weights file exists but cannot be read or parsed.
const ERROR_WEIGHTS: (f64, f64, f64) = (0.18, 0.16, 0.42);

impl FeatureWeights {
    /// Build from raw weights, normalizing so they sum to 1.
    /// Negative or non-finite inputs count as 0; an all-zero triple becomes
    /// equal thirds.
    pub fn normalized(ph: f64, turbidity: f64, solids: f64) -> Self {
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let (ph, turbidity, solids) = (clean(ph), clean(turbidity), clean(solids));
        // Scale by the largest weight first so huge finite inputs cannot sum to inf.
        let max = ph.max(turbidity).max(solids);
        if max <= 0.0 {
            return Self {
                ph: 1.0 / 3.0,
                turbidity: 1.0 / 3.0,
                solids: 1.0 / 3.0,
            };
        }
        let (ph, turbidity, solids) = (ph / max, turbidity / max, solids / max);
        let sum = ph + turbidity + solids;
        Self {
            ph: ph / sum,
            turbidity: turbidity / sum,
            solids: solids / sum,
        }
    }

    /// Fallback triple used when no weights file is present.
    pub fn defaults() -> Self {
        let (p, t, s) = DEFAULT_WEIGHTS;
        Self::normalized(p, t, s)
    }

    fn on_error() -> Self {
        let (p, t, s) = ERROR_WEIGHTS;
        Self::normalized(p, t, s)
    }

    /// Keep the known features from a name → weight table.
    pub fn from_table(table: &HashMap<String, f64>) -> Self {
        let get = |f: Feature| table.get(f.name()).copied().unwrap_or(0.0);
        Self::normalized(
            get(Feature::Ph),
            get(Feature::Turbidity),
            get(Feature::Solids),
        )
    }

    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Ph => self.ph,
            Feature::Turbidity => self.turbidity,
            Feature::Solids => self.solids,
        }
    }

    pub fn sum(&self) -> f64 {
        self.ph + self.turbidity + self.solids
    }

    /// Name-keyed view for diagnostics.
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        Feature::ALL
            .iter()
            .map(|f| (f.name().to_string(), self.get(*f)))
            .collect()
    }
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Load weights from `path`. Never fails; see the module docs for fallbacks.
pub fn load_weights(path: &Path) -> FeatureWeights {
    if !path.exists() {
        warn!(path = %path.display(), "weights file not found, using default weights");
        return FeatureWeights::defaults();
    }
    match try_load_weights(path) {
        Ok(w) => {
            info!(
                path = %path.display(),
                ph = w.ph,
                turbidity = w.turbidity,
                solids = w.solids,
                "feature weights loaded"
            );
            w
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "error loading feature weights, using fallback");
            FeatureWeights::on_error()
        }
    }
}

/// Strict loader: reports why a file could not be used. Public for tools/tests.
pub fn try_load_weights(path: &Path) -> Result<FeatureWeights> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading weights from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let table = match ext.as_str() {
        "json" => parse_json_table(&content)?,
        _ => parse_csv_table(&content)?,
    };
    Ok(FeatureWeights::from_table(&table))
}

fn parse_csv_table(content: &str) -> Result<HashMap<String, f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = reader.headers().context("reading weights header")?.clone();

    let position = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let name_col = position(&["Thong_so", "feature"][..])
        .ok_or_else(|| anyhow!("weights CSV has no feature-name column"))?;
    let weight_col =
        position(&["Weight"][..]).ok_or_else(|| anyhow!("weights CSV has no Weight column"))?;

    let mut table = HashMap::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading weights row {}", i + 1))?;
        let name = record.get(name_col).unwrap_or_default().to_string();
        let raw = record.get(weight_col).unwrap_or_default();
        let weight = if raw.is_empty() {
            0.0
        } else {
            raw.parse::<f64>()
                .with_context(|| format!("weight for `{name}` is not a number: {raw:?}"))?
        };
        table.insert(name, weight);
    }
    Ok(table)
}

fn parse_json_table(content: &str) -> Result<HashMap<String, f64>> {
    #[derive(Deserialize)]
    struct Row {
        feature: String,
        weight: f64,
    }
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Map(HashMap<String, f64>),
        Rows(Vec<Row>),
    }

    let shape: Shape = serde_json::from_str(content).context("parsing weights JSON")?;
    Ok(match shape {
        Shape::Map(m) => m,
        Shape::Rows(rows) => rows.into_iter().map(|r| (r.feature, r.weight)).collect(),
    })
}
