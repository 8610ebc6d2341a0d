//! Append-only CSV log of probe measurements (`ph,tds,ntu,label`).
//!
//! Every accepted reading lands here with its verdict (`1` clean, `0` dirty),
//! which later feeds retraining. Absent metrics are written as empty cells.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::sample::round_to;

const HEADER: [&str; 4] = ["ph", "tds", "ntu", "label"];

#[derive(Debug)]
pub struct MeasurementLogger {
    path: PathBuf,
    file: Mutex<File>,
}

/// Quick summary of what has been logged so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogStats {
    pub total_samples: usize,
    pub clean_count: usize,
    pub dirty_count: usize,
    pub clean_percentage: f64,
    pub dirty_percentage: f64,
    pub filepath: String,
}

impl MeasurementLogger {
    /// Open (or create, with header) the log at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
            .with_context(|| format!("opening measurement log {}", path.display()))?;

        // Empty counts as new: touched or truncated files still need a header.
        let fresh = file
            .metadata()
            .with_context(|| format!("reading metadata of {}", path.display()))?
            .len()
            == 0;
        if fresh {
            let mut w = csv::Writer::from_writer(&mut file);
            w.write_record(HEADER).context("writing log header")?;
            w.flush().context("flushing log header")?;
            info!(path = %path.display(), "measurement log created");
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| anyhow!("measurement log mutex poisoned"))
    }

    /// Append one row. pH and NTU keep 2 decimals, TDS keeps 1.
    pub fn log_measurement(
        &self,
        ph: Option<f64>,
        tds: Option<f64>,
        ntu: Option<f64>,
        is_clean: bool,
    ) -> Result<()> {
        let cell = |v: Option<f64>, places: i32| {
            v.filter(|x| x.is_finite())
                .map(|x| round_to(x, places).to_string())
                .unwrap_or_default()
        };
        let row = [
            cell(ph, 2),
            cell(tds, 1),
            cell(ntu, 2),
            if is_clean { "1" } else { "0" }.to_string(),
        ];

        let mut file = self.lock()?;
        let mut w = csv::Writer::from_writer(&mut *file);
        w.write_record(&row)
            .with_context(|| format!("appending to {}", self.path.display()))?;
        w.flush().context("flushing measurement log")?;
        debug!(path = %self.path.display(), label = %row[3], "measurement logged");
        Ok(())
    }

    /// Labels of every data row, in file order.
    fn labels(&self) -> Result<Vec<String>> {
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(0))
            .context("rewinding measurement log")?;
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(&mut *file);
        let label_col = reader
            .headers()
            .context("reading log header")?
            .iter()
            .position(|h| h == "label")
            .ok_or_else(|| anyhow!("measurement log has no label column"))?;

        let mut out = Vec::new();
        for record in reader.records() {
            let record = record.context("reading measurement log row")?;
            out.push(record.get(label_col).unwrap_or_default().to_string());
        }
        Ok(out)
    }

    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> Result<usize> {
        Ok(self.labels()?.len())
    }

    pub fn stats(&self) -> Result<LogStats> {
        let labels = self.labels()?;
        let total = labels.len();
        let clean = labels.iter().filter(|l| l.as_str() == "1").count();
        let dirty = labels.iter().filter(|l| l.as_str() == "0").count();
        let pct = |n: usize| {
            if total == 0 {
                0.0
            } else {
                round_to(n as f64 / total as f64 * 100.0, 1)
            }
        };
        Ok(LogStats {
            total_samples: total,
            clean_count: clean,
            dirty_count: dirty,
            clean_percentage: pct(clean),
            dirty_percentage: pct(dirty),
            filepath: self.path.display().to_string(),
        })
    }
}
