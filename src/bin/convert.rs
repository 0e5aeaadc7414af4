use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use sheetscan::{AppConfig, ConversionReport, build_converter};
use sheetscan_grid::{RowAnchor, RowOrder};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "convert",
    version,
    about = "Convert a scanned table image into an xlsx or csv file"
)]
struct Cli {
    /// Table image (png, jpeg, bmp, tiff).
    image_path: PathBuf,

    /// Output file name; placed in the output directory. `.csv` writes CSV,
    /// anything else an xlsx workbook.
    output_filename: PathBuf,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pre-recognized fragments (JSON) used instead of an OCR engine.
    #[arg(long)]
    fragments: Option<PathBuf>,

    /// Directory the output file is written to.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maximum vertical distance, in pixels, within one row.
    #[arg(long)]
    threshold: Option<f64>,

    /// Row reference y: first | mean.
    #[arg(long)]
    row_anchor: Option<String>,

    /// Cell order inside a row: scan | left-to-right.
    #[arg(long)]
    row_order: Option<String>,

    /// Write the grid without asking the model about the header row.
    #[arg(long)]
    skip_header_check: bool,

    /// Enable verbose logging and warning output.
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if let Some(output_dir) = &cli.output_dir {
        config.output_dir.clone_from(output_dir);
    }
    if let Some(threshold) = cli.threshold {
        config.cluster.threshold = threshold;
    }
    if let Some(anchor) = cli.row_anchor.as_deref() {
        config.cluster.anchor = RowAnchor::from_str(anchor)
            .map_err(|error| anyhow!("{error}"))
            .context("failed to parse --row-anchor")?;
    }
    if let Some(order) = cli.row_order.as_deref() {
        config.cluster.order = RowOrder::from_str(order)
            .map_err(|error| anyhow!("{error}"))
            .context("failed to parse --row-order")?;
    }
    if cli.skip_header_check {
        config.header_check.enabled = false;
    }
    Ok(config)
}

fn log_report(report: &ConversionReport, verbose: bool) {
    if let Some(verdict) = &report.verdict {
        println!("header check: {}", verdict.message);
    }
    println!("wrote {}", report.output_path.display());

    if report.warnings.is_empty() {
        return;
    }
    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} row={:?} distance={:?} confidence={:?}: {}",
                warning.code, warning.row, warning.distance, warning.confidence, warning.message
            );
        }
    }
}

fn run(cli: &Cli) -> Result<ConversionReport> {
    let config = load_config(cli)?;
    let converter = build_converter(&config, cli.fragments.as_deref())?;
    converter
        .convert(&cli.image_path, &cli.output_filename)
        .with_context(|| format!("failed to convert '{}'", cli.image_path.display()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "sheetscan=info,sheetscan_grid=info"
    } else {
        "sheetscan=warn,sheetscan_grid=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match run(&cli) {
        Ok(report) => {
            log_report(&report, cli.verbose);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
