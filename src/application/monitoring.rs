use crate::domain::ports::PartRepository;
use crate::domain::{
    row_match::RowMatch,
    value_objects::{ColumnName, FieldTarget, Key, TableName},
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, instrument};

// ─── PerfReport ──────────────────────────────────────────────────────────────

/// A single timed operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OpTiming {
    /// Operation name: "find_matches" or "apply_update".
    pub operation: &'static str,
    /// Key the operation was performed for.
    pub key: String,
    /// Elapsed wall time in milliseconds.
    pub duration_ms: u128,
    /// Number of rows involved (matched or written fields).
    pub rows: usize,
}

/// Accumulated performance timings for a single run.
///
/// Shared with the decorator via `Arc<Mutex<_>>`. After the run, pass to
/// [`crate::presentation::cli_summary::print_perf_summary`] to render a
/// human-readable table.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct PerfReport {
    pub timings: Vec<OpTiming>,
}

impl PerfReport {
    pub fn new() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::default()))
    }

    fn record(report: &Arc<Mutex<Self>>, timing: OpTiming) {
        if let Ok(mut r) = report.lock() {
            r.timings.push(timing);
        }
    }

    pub fn total_ms(&self) -> u128 {
        self.timings.iter().map(|t| t.duration_ms).sum()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.timings.iter().filter(|t| t.operation == operation).count()
    }

    /// Slowest call per operation, if any.
    pub fn slowest(&self, operation: &str) -> Option<&OpTiming> {
        self.timings
            .iter()
            .filter(|t| t.operation == operation)
            .max_by_key(|t| t.duration_ms)
    }
}

// ─── MonitoringPartRepository ────────────────────────────────────────────────

/// Decorator: wraps any `PartRepository`, measures wall time per call, and
/// appends the result to the shared `PerfReport`.
pub struct MonitoringPartRepository {
    inner: Arc<dyn PartRepository>,
    report: Arc<Mutex<PerfReport>>,
}

impl MonitoringPartRepository {
    pub fn new(inner: Arc<dyn PartRepository>, report: Arc<Mutex<PerfReport>>) -> Self {
        Self { inner, report }
    }
}

#[async_trait]
impl PartRepository for MonitoringPartRepository {
    #[instrument(
        name = "find_matches",
        skip(self, key, fields),
        fields(part.key = %key.value),
        level = "debug"
    )]
    async fn find_matches(&self, key: &Key, fields: &[ColumnName]) -> Result<Vec<RowMatch>> {
        let start = Instant::now();
        let matches = self.inner.find_matches(key, fields).await?;
        let duration_ms = start.elapsed().as_millis();

        tracing::debug!(key = %key.value, matches = matches.len(), duration_ms, "find_matches completed");

        PerfReport::record(
            &self.report,
            OpTiming {
                operation: "find_matches",
                key: key.value.clone(),
                duration_ms,
                rows: matches.len(),
            },
        );

        Ok(matches)
    }

    #[instrument(
        name = "apply_update",
        skip(self, table, key, changes),
        fields(db.table = %table.0, part.key = %key.value),
        level = "info"
    )]
    async fn apply_update(
        &self,
        table: &TableName,
        key: &Key,
        changes: &[FieldTarget],
    ) -> Result<()> {
        let start = Instant::now();
        self.inner.apply_update(table, key, changes).await?;
        let duration_ms = start.elapsed().as_millis();

        info!(table = %table.0, key = %key.value, fields = changes.len(), duration_ms, "apply_update completed");

        PerfReport::record(
            &self.report,
            OpTiming {
                operation: "apply_update",
                key: key.value.clone(),
                duration_ms,
                rows: changes.len(),
            },
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::InMemoryPartRepository;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn records_one_timing_per_call() {
        let inner = InMemoryPartRepository::new().with_rows(
            "IC",
            vec![[
                ("MANUPARTNUM".to_string(), json!("ABC123")),
                ("INT_BIONUM".to_string(), Value::Null),
            ]
            .into_iter()
            .collect()],
        );
        let report = PerfReport::new();
        let repo = MonitoringPartRepository::new(Arc::new(inner), Arc::clone(&report));
        let key = Key::part_number("ABC123");

        let found = repo
            .find_matches(&key, &[ColumnName("INT_BIONUM".into())])
            .await
            .unwrap();
        repo.apply_update(
            &TableName("IC".into()),
            &key,
            &[FieldTarget::new("INT_BIONUM", "BIO-5")],
        )
        .await
        .unwrap();

        let perf = report.lock().unwrap().clone();
        assert_eq!(found.len(), 1);
        assert_eq!(perf.count("find_matches"), 1);
        assert_eq!(perf.count("apply_update"), 1);
        assert_eq!(perf.slowest("find_matches").map(|t| t.rows), Some(1));
    }

    #[tokio::test]
    async fn failed_calls_are_not_recorded() {
        let report = PerfReport::new();
        let repo = MonitoringPartRepository::new(
            Arc::new(InMemoryPartRepository::new()),
            Arc::clone(&report),
        );

        let result = repo
            .apply_update(&TableName("IC".into()), &Key::part_number("X"), &[])
            .await;

        assert!(result.is_err());
        assert!(report.lock().unwrap().timings.is_empty());
    }
}
