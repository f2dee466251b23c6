//! # Partsync — library usage example
//!
//! Two ways to drive partsync from Rust:
//!
//! 1. **Against a database** — config file plus CSV, mirrors the CLI
//! 2. **Against an in-memory library** — no database, records built in code
//!
//! Run against a database (dry run):
//!   cargo run --example reconcile_as_lib -- partsync.toml parts.csv
//!
//! Run the in-memory walkthrough:
//!   cargo run --example reconcile_as_lib

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use partsync::{
    presentation::writers::{lines::LinesWriter, writer_for},
    AppConfig, FieldTarget, InMemoryPartRepository, Key, ReconciliationRecord, ReportOutput,
    RowMap, RunMode, RunSummary,
};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match (args.get(1), args.get(2)) {
        (Some(config), Some(csv)) => against_database(Path::new(config), Path::new(csv)).await,
        _ => in_memory().await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern 1 — config file and CSV, same as the CLI does internally
// ─────────────────────────────────────────────────────────────────────────────
async fn against_database(config: &Path, csv: &Path) -> Result<()> {
    println!("=== Pattern 1: {} against {} ===\n", csv.display(), config.display());

    let cfg = AppConfig::load(Some(config))?;
    let sql = writer_for("sql", &cfg.database)
        .ok_or_else(|| anyhow::anyhow!("sql writer not registered"))?;
    let mut outputs = vec![
        ReportOutput::stdout(Box::new(LinesWriter)),
        ReportOutput::file(sql, Path::new("./output"), "pending")?,
    ];

    let summary = partsync::run(&cfg, csv, RunMode::DryRun, &mut outputs).await?;
    print_summary(&summary);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern 2 — in-memory library, useful for tests and previews
// ─────────────────────────────────────────────────────────────────────────────
async fn in_memory() -> Result<()> {
    println!("=== Pattern 2: in-memory library ===\n");

    let part = |num: &str, bionum: Value| -> RowMap {
        RowMap::from([
            ("MANUPARTNUM".to_string(), json!(num)),
            ("INT_BIONUM".to_string(), bionum),
            ("DATASHEET".to_string(), json!("SHEET-1")),
        ])
    };
    let repo = Arc::new(
        InMemoryPartRepository::new()
            .with_rows("IC", vec![part("ABC123", Value::Null), part("XYZ789", json!("BIO-9"))])
            .with_rows("MISC", vec![part("XYZ789", Value::Null)]),
    );

    let records = ["ABC123", "XYZ789", "NOPE-1"].map(|num| {
        ReconciliationRecord::new(
            Key::part_number(num),
            vec![
                FieldTarget::new("INT_BIONUM", "BIO-5"),
                FieldTarget::new("DATASHEET", "sheet-1"),
            ],
        )
    });

    let mut outputs = vec![ReportOutput::stdout(Box::new(LinesWriter))];
    let summary = partsync::reconcile(repo.clone(), records, RunMode::Commit, &mut outputs).await?;

    print_summary(&summary);
    for (table, key, changes) in repo.writes() {
        println!("  wrote {} field(s) to {} for {}", changes.len(), table, key.value);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Run      : {} ({})", summary.run_id, summary.mode);
    println!("Records  : {}", summary.records);
    println!("Missing  : {}", summary.missing);
    println!("Dupes    : {}", summary.duplicates);
    println!("Updated  : {}", summary.updated);
}
