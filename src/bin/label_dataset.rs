//! Label a CSV dataset of probe readings with the strict WHO rules.
//!
//! ```text
//! label-dataset --input data/water_potability.csv --output data/water_potability_labeled.csv
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use water_quality::label::{label_csv, LabelConfig};

#[derive(Debug, Parser)]
#[command(version, about = "Label water quality dataset (strict WHO rules)")]
struct Args {
    /// Input CSV file path
    #[arg(long)]
    input: PathBuf,

    /// Output CSV file path
    #[arg(long)]
    output: PathBuf,

    /// Treat borderline readings (TDS 500-1000 mg/L, NTU 1-5) as clean
    #[arg(long)]
    allow_borderline_clean: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let args = Args::parse();
    let cfg = LabelConfig::default().with_strict(!args.allow_borderline_clean);

    if !args.input.exists() {
        bail!("input file not found: {}", args.input.display());
    }
    let input = File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let output = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let summary = label_csv(BufReader::new(input), BufWriter::new(output), &cfg)?;
    info!(
        output = %args.output.display(),
        rows = summary.rows,
        clean = summary.clean,
        dirty = summary.dirty,
        truncated = summary.truncated,
        "wrote labeled dataset"
    );
    Ok(())
}
