use anyhow::{bail, Result};
use chrono::Local;
use clap::{CommandFactory, Parser};
use partsync::presentation::cli_summary::{print_perf_summary, print_summary};
use partsync::presentation::writers::{all_writers, writer_for};
use partsync::{AppConfig, LogLevel, ReportOutput, RunMode};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "partsync",
    about = "Partsync — Fill empty part-library fields from a CSV, safely."
)]
struct Cli {
    /// CSV file with the records to reconcile
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Write eligible updates. Without it the run only reports.
    #[arg(long)]
    commit: bool,

    /// Configuration file (defaults to ./partsync.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report format: lines, json, sql or all
    #[arg(long, default_value = "lines")]
    format: String,

    /// Write reports into this directory instead of stdout
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Show SQL queries and per-call timings
    #[arg(short, long)]
    verbose: bool,

    /// Only errors; no summary tables
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LogLevel {
        match (self.quiet, self.verbose) {
            (true, _) => LogLevel::Error,
            (_, true) => LogLevel::Debug,
            _ => LogLevel::Info,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    partsync::init_tracing(cli.log_level());

    let Some(input) = cli.file.as_deref() else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let cfg = AppConfig::load(cli.config.as_deref())?;
    let mode = RunMode::from_commit_flag(cli.commit);
    let mut outputs = build_outputs(&cli, &cfg)?;

    let (summary, perf) = partsync::run_with_timing(&cfg, input, mode, &mut outputs).await?;

    if !cli.quiet {
        print_summary(&summary);
        print_perf_summary(&perf);
    }
    for path in outputs.iter().filter_map(|o| o.path()) {
        eprintln!("Report written to {}", path.display());
    }

    Ok(())
}

fn build_outputs(cli: &Cli, cfg: &AppConfig) -> Result<Vec<ReportOutput>> {
    let writers = match cli.format.as_str() {
        "all" => all_writers(&cfg.database),
        fmt => vec![writer_for(fmt, &cfg.database)
            .ok_or_else(|| anyhow::anyhow!("Unknown format: {}", fmt))?],
    };

    match &cli.out_dir {
        Some(dir) => {
            let stem = format!("partsync_{}", Local::now().format("%Y%m%d_%H%M%S"));
            writers
                .into_iter()
                .map(|w| ReportOutput::file(w, dir, &stem))
                .collect()
        }
        None if writers.len() > 1 => bail!("--format all needs --out-dir"),
        None => Ok(writers.into_iter().map(ReportOutput::stdout).collect()),
    }
}
