use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sheetscan_grid::{RetypeReport, parse_column_types, retype_csv};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "retype",
    version,
    about = "Rewrite CSV columns as numbers or text"
)]
struct Cli {
    /// CSV file to rewrite in place. The first row holds the headers.
    csv_path: PathBuf,

    /// JSON object mapping column name to "number" or "text".
    column_types: String,

    /// Report mapped columns that are missing from the header row.
    #[arg(short, long)]
    verbose: bool,
}

fn log_report(report: &RetypeReport, verbose: bool) {
    println!("{}", report.message);
    if !verbose {
        return;
    }

    eprintln!(
        "  rows={} converted_cells={}",
        report.row_count, report.converted_cells
    );
    for column in &report.unknown_columns {
        eprintln!("  - column '{column}' is not in the header row");
    }
}

fn run(cli: &Cli) -> Result<RetypeReport> {
    let types = parse_column_types(&cli.column_types).context("invalid column type JSON")?;
    retype_csv(&cli.csv_path, &types)
        .with_context(|| format!("failed to update '{}'", cli.csv_path.display()))
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sheetscan_grid=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
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
