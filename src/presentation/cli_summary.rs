use crate::application::monitoring::PerfReport;
use crate::domain::summary::RunSummary;
use colored::*;
use tabled::settings::{object::Columns, Alignment, Modify, Style};
use tabled::{Table, Tabled};

// Everything here goes to stderr: stdout is reserved for the report itself.

#[derive(Tabled)]
struct SummaryRow {
    metric: String,
    value: String,
}

pub fn print_summary(summary: &RunSummary) {
    eprintln!();

    eprintln!("{}", "PARTSYNC RUN SUMMARY".bold().cyan());
    eprintln!(
        "Run: {}  ·  mode: {}",
        summary.run_id.bright_yellow(),
        match summary.mode.is_commit() {
            true => summary.mode.to_string().red().bold(),
            false => summary.mode.to_string().green(),
        }
    );
    eprintln!();

    if summary.records == 0 {
        eprintln!("{}", "No records in input.".italic());
        return;
    }

    let rows = vec![
        SummaryRow {
            metric: "Records".into(),
            value: summary.records.to_string().bold().to_string(),
        },
        SummaryRow {
            metric: "Missing keys".into(),
            value: summary.missing.to_string().yellow().to_string(),
        },
        SummaryRow {
            metric: "Duplicate keys".into(),
            value: summary.duplicates.to_string().red().to_string(),
        },
        SummaryRow {
            metric: "Unique (not written)".into(),
            value: summary.unique.to_string(),
        },
        SummaryRow {
            metric: "Eligible".into(),
            value: summary.eligible.to_string().green().to_string(),
        },
        SummaryRow {
            metric: "Updated".into(),
            value: summary.updated.to_string().green().bold().to_string(),
        },
        SummaryRow {
            metric: "Mismatched fields".into(),
            value: summary.mismatched_fields.to_string().red().to_string(),
        },
        SummaryRow {
            metric: "Written fields".into(),
            value: summary.written_fields.to_string().green().to_string(),
        },
    ];

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..=1)).with(Alignment::right()))
        .to_string();

    eprintln!("{table}");
    eprintln!();
}

// ─── Performance summary ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct PerfRow {
    operation: String,
    calls: String,
    #[tabled(rename = "slowest key")]
    slowest_key: String,
    #[tabled(rename = "slowest (ms)")]
    slowest_ms: String,
}

/// Print a performance timing table to stderr.
pub fn print_perf_summary(report: &PerfReport) {
    if report.timings.is_empty() {
        return;
    }

    eprintln!("{}", "PERFORMANCE".bold().cyan());

    let rows: Vec<PerfRow> = ["find_matches", "apply_update"]
        .into_iter()
        .filter_map(|op| {
            report.slowest(op).map(|t| PerfRow {
                operation: op.dimmed().to_string(),
                calls: report.count(op).to_string(),
                slowest_key: t.key.bold().to_string(),
                slowest_ms: format_duration(t.duration_ms),
            })
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..=3)).with(Alignment::right()))
        .to_string();

    eprintln!("{table}");

    eprintln!(
        "  Total: {} call(s)  ·  {} ms in the database",
        report.timings.len().to_string().bold(),
        format_duration(report.total_ms()),
    );
    eprintln!();
}

fn format_duration(ms: u128) -> String {
    if ms >= 1_000 {
        format!("{:.1}s", ms as f64 / 1_000.0).yellow().to_string()
    } else if ms >= 100 {
        ms.to_string().yellow().to_string()
    } else {
        ms.to_string().green().to_string()
    }
}
