//! Ironcart CLI - customer analytics from a retail CSV export
//!
//! Usage:
//!   ironcart analyze --input <orders.csv> [--config ironcart.toml] [--out-dir DIR] [--row-limit N] [-v]
//!   ironcart repair --input <orders.csv> --output <fixed.csv>
//!
//! Examples:
//!   ironcart analyze --input data/online_retail.csv.gz --out-dir reports
//!   RUST_LOG=ironcart=debug ironcart analyze --input orders.csv --config ironcart.toml
//!   ironcart repair --input export.csv --output export_fixed.csv

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ironcart::config::Settings;
use ironcart::io::compression::auto_detect_reader;
use ironcart::io::export::write_csv_records;
use ironcart::io::repair::repair_headers;
use ironcart::pipeline::{AnalysisReport, Analyzer};
use ironcart::rfm::segment_counts;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ironcart")]
#[command(about = "RFM segmentation, CLTV and market-basket rules from transaction CSVs")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write the results as CSV
    Analyze {
        /// Source CSV (may be .gz or .zst compressed)
        #[arg(short, long)]
        input: PathBuf,

        /// TOML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for the result files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Maximum number of data rows to read
        #[arg(long)]
        row_limit: Option<usize>,
    },

    /// Replace blank header names with placeholders
    Repair {
        /// Source CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the repaired copy
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Commands::Analyze {
            input,
            config,
            out_dir,
            row_limit,
        } => cmd_analyze(&input, config.as_deref(), &out_dir, row_limit),
        Commands::Repair { input, output } => cmd_repair(&input, &output),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_analyze(
    input: &Path,
    config: Option<&Path>,
    out_dir: &Path,
    row_limit: Option<usize>,
) -> Result<()> {
    let mut settings = Settings::load(config).context("load settings")?;
    if let Some(limit) = row_limit {
        settings.ingest.row_limit = limit.max(1);
    }

    let report = Analyzer::new(settings).analyze_path(input)?;
    write_report(&report, out_dir)?;
    print_summary(&report);
    Ok(())
}

fn write_report(report: &AnalysisReport, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("mkdir -p {}", out_dir.display()))?;
    write_csv_records(out_dir.join("rfm.csv"), &report.rfm)?;
    write_csv_records(
        out_dir.join("cltv_segments.csv"),
        &report.cltv.segment_summaries,
    )?;
    write_csv_records(
        out_dir.join("cltv_customers.csv"),
        &report.cltv.customer_details,
    )?;
    write_csv_records(out_dir.join("rules.csv"), &report.basket.rules)?;
    write_csv_records(
        out_dir.join("frequent_items.csv"),
        &report.basket.frequent_items,
    )?;
    report.metrics.save_to_file(out_dir.join("metrics.json"))?;
    info!(dir = %out_dir.display(), "wrote analysis results");
    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    let ingest = &report.ingest;
    println!(
        "Rows: {} read{}, {} skipped{}",
        ingest.row_count,
        if ingest.truncated { " (truncated)" } else { "" },
        ingest.skipped_rows,
        if ingest.headers_repaired {
            ", headers repaired"
        } else {
            ""
        },
    );
    println!(
        "Transactions: {} of {} rows kept",
        report.cleaning.output_rows, report.cleaning.input_rows
    );
    println!("Customers: {}", report.rfm.len());
    for (segment, count) in segment_counts(&report.rfm) {
        println!("  {segment}: {count}");
    }
    println!(
        "Repeat rate: {:.1}%, churn: {:.1}%",
        report.cltv.repeat_rate * 100.0,
        report.cltv.effective_churn * 100.0
    );
    println!(
        "Baskets: {}, frequent items: {}, rules: {}",
        report.basket.basket_count,
        report.basket.frequent_items.len(),
        report.basket.rules.len()
    );
    for notice in &report.notices {
        println!("Note: {notice}");
    }
    report.metrics.print();
}

fn cmd_repair(input: &Path, output: &Path) -> Result<()> {
    let file = File::open(input).with_context(|| format!("open {}", input.display()))?;
    let mut reader = auto_detect_reader(file, input)?;
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .with_context(|| format!("read {}", input.display()))?;

    let repaired = repair_headers(&text);
    fs::write(output, repaired.as_bytes())
        .with_context(|| format!("write {}", output.display()))?;
    if repaired == text {
        info!("no blank header names found; wrote an unchanged copy");
    } else {
        info!(output = %output.display(), "wrote repaired copy");
    }
    Ok(())
}
