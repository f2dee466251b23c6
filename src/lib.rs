use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// ─── Log level ────────────────────────────────────────────────────────────────

/// Controls the verbosity of partsync's internal tracing output.
///
/// Pass to [`init_tracing`] before calling any async entry point.
///
/// | Variant | `tracing` level | When to use                          |
/// |---------|-----------------|--------------------------------------|
/// | `Error` | `error`         | `--quiet` / CI scripting             |
/// | `Info`  | `info`          | Default — blocked and applied updates |
/// | `Debug` | `debug`         | `--verbose` — shows SQL queries too  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Info,
    Debug,
}

/// Initialise the global `tracing` subscriber for partsync.
///
/// Respects `RUST_LOG` when set, falling back to `level` otherwise. Logs go
/// to stderr; stdout carries the report.
///
/// Only available when the `cli` feature is enabled (pulls in
/// `tracing-subscriber`).
#[cfg(feature = "cli")]
pub fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let default_filter = match level {
        LogLevel::Error => "partsync=error",
        LogLevel::Info => "partsync=info",
        LogLevel::Debug => "partsync=debug",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

// ─── Public API Facade ───

pub use application::monitoring::PerfReport;
pub use application::reconcile::ReconciliationService;
pub use domain::classification::{
    classify_field, classify_key, FieldClassification, FieldStatus, KeyClassification,
};
pub use domain::memory::InMemoryPartRepository;
pub use domain::ports::{PartRepository, ReportWriter};
pub use domain::record::{FieldState, ReconciliationRecord};
pub use domain::row_match::{RowMap, RowMatch};
pub use domain::summary::{RunMode, RunSummary};
pub use domain::value_objects::{ColumnName, FieldTarget, Key, TableName, KEY_DISCRIMINATOR};
pub use infrastructure::config::{AppConfig, DbConfig, FieldColumn, InputConfig, LookupConfig};
pub use presentation::writers::ReportOutput;

use crate::application::monitoring::MonitoringPartRepository;
use crate::infrastructure::db::client::connect;
use crate::infrastructure::input::CsvRecordSource;

// ─── Public entry points ───

/// Reconcile the CSV at `input` against the configured database.
///
/// Use [`run_with_timing`] if you also want a performance report.
pub async fn run(
    cfg: &AppConfig,
    input: &Path,
    mode: RunMode,
    outputs: &mut [ReportOutput],
) -> Result<RunSummary> {
    let (summary, _) = run_with_timing(cfg, input, mode, outputs).await?;
    Ok(summary)
}

/// Reconcile with performance timing.
///
/// Opens the single database connection, processes every record, and
/// closes the connection again whether or not the run succeeded.
pub async fn run_with_timing(
    cfg: &AppConfig,
    input: &Path,
    mode: RunMode,
    outputs: &mut [ReportOutput],
) -> Result<(RunSummary, PerfReport)> {
    let records = CsvRecordSource::open(input, &cfg.input, &cfg.lookup.key_column)?;

    let report = PerfReport::new();
    let store = Arc::new(connect(cfg).await?);
    let repo = Arc::new(MonitoringPartRepository::new(
        Arc::clone(&store) as Arc<dyn PartRepository>,
        Arc::clone(&report),
    ));

    let outcome = reconcile(repo, records, mode, outputs).await;
    store.close().await;
    let summary = outcome?;

    let perf = report.lock().map(|r| r.clone()).unwrap_or_default();
    Ok((summary, perf))
}

/// Reconcile `records` against any [`PartRepository`], writing each record
/// to every output as soon as it is final.
///
/// This is the storage-agnostic core of [`run`]; use it with
/// [`InMemoryPartRepository`] or your own repository.
pub async fn reconcile<I>(
    repo: Arc<dyn PartRepository>,
    records: I,
    mode: RunMode,
    outputs: &mut [ReportOutput],
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Result<ReconciliationRecord>>,
{
    for out in outputs.iter_mut() {
        out.begin()?;
    }

    let service = ReconciliationService::new(repo, mode);
    let summary = service
        .run(records, |record| {
            for out in outputs.iter_mut() {
                out.emit(record)?;
            }
            Ok(())
        })
        .await?;

    for out in outputs.iter_mut() {
        out.finish(&summary)?;
    }
    Ok(summary)
}
