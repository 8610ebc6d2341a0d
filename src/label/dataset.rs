//! Batch labeling of historical readings stored as CSV.
//!
//! Column names vary between datasets (`ph`/`pH`, `tds`/`Solids`,
//! `ntu`/`Turbidity`), so they are resolved case-insensitively. The original
//! columns are written back unchanged, followed by `label`, `is_clean`,
//! `reasons` and `confidence`.

use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use super::{compute_label, LabelConfig};

const PH_CANDIDATES: &[&str] = &["ph"];
const TDS_CANDIDATES: &[&str] = &["tds", "solids"];
const NTU_CANDIDATES: &[&str] = &["ntu", "turbidity"];

/// Derived columns appended to every row.
pub const DERIVED_COLUMNS: [&str; 4] = ["label", "is_clean", "reasons", "confidence"];

/// Indices of the three metric columns within a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricColumns {
    pub ph: usize,
    pub tds: usize,
    pub ntu: usize,
}

/// Counts reported after a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelSummary {
    pub rows: usize,
    pub clean: usize,
    pub dirty: usize,
    /// Rows that had more cells than the header; the extra cells are dropped.
    pub truncated: usize,
}

/// Resolve the pH, TDS and turbidity columns. Errors name every missing one.
pub fn resolve_columns<'a, I>(headers: I) -> Result<MetricColumns>
where
    I: IntoIterator<Item = &'a str>,
{
    let lowered: Vec<String> = headers
        .into_iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let find = |candidates: &[&str]| {
        candidates
            .iter()
            .find_map(|c| lowered.iter().position(|h| h == c))
    };

    let ph = find(PH_CANDIDATES);
    let tds = find(TDS_CANDIDATES);
    let ntu = find(NTU_CANDIDATES);

    match (ph, tds, ntu) {
        (Some(ph), Some(tds), Some(ntu)) => Ok(MetricColumns { ph, tds, ntu }),
        _ => {
            let missing: Vec<&str> = [("pH", ph), ("TDS/Solids", tds), ("Turbidity", ntu)]
                .iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| *name)
                .collect();
            bail!("Missing required columns: {}", missing.join(", "))
        }
    }
}

/// Parse a cell into a metric value. Empty, `NaN` or unparsable cells are absent.
pub fn parse_cell(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Label every row read from `input` and write the augmented table to `output`.
pub fn label_csv<R: Read, W: Write>(
    input: R,
    output: W,
    cfg: &LabelConfig,
) -> Result<LabelSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(input);
    let mut writer = csv::Writer::from_writer(output);

    let headers = reader.headers().context("reading CSV header")?.clone();
    let cols = resolve_columns(headers.iter())?;

    let mut out_header: Vec<&str> = headers.iter().collect();
    out_header.extend(DERIVED_COLUMNS);
    writer
        .write_record(&out_header)
        .context("writing CSV header")?;

    let mut summary = LabelSummary::default();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading CSV row {}", line + 1))?;

        let ph = parse_cell(record.get(cols.ph));
        let tds = parse_cell(record.get(cols.tds));
        let ntu = parse_cell(record.get(cols.ntu));
        let res = compute_label(ph, tds, ntu, cfg);
        debug!(row = line + 1, label = res.label.as_str(), "labeled row");

        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.len() > headers.len() {
            warn!(
                row = line + 1,
                cells = row.len(),
                columns = headers.len(),
                "row wider than header, extra cells dropped"
            );
            summary.truncated += 1;
        }
        // Rows are resized to the header width so derived columns line up.
        row.resize(headers.len(), String::new());
        row.push(res.label.as_str().to_string());
        row.push(if res.is_clean { "True" } else { "False" }.to_string());
        row.push(res.reasons.join("; "));
        row.push(res.confidence.to_string());
        writer
            .write_record(&row)
            .with_context(|| format!("writing CSV row {}", line + 1))?;

        summary.rows += 1;
        if res.is_clean {
            summary.clean += 1;
        } else {
            summary.dirty += 1;
        }
    }

    writer.flush().context("flushing CSV output")?;
    info!(
        rows = summary.rows,
        clean = summary.clean,
        dirty = summary.dirty,
        truncated = summary.truncated,
        strict = cfg.strict,
        "dataset labeled"
    );
    Ok(summary)
}
