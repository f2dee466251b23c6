use anyhow::{ensure, Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{
    ports::PartRepository,
    record::ReconciliationRecord,
    summary::{RunMode, RunSummary},
    value_objects::{ColumnName, KEY_DISCRIMINATOR},
};

// ─── Reconciliation Service ───

/// Validates input records against the parts library and, in commit mode,
/// writes the fields that are safe to change.
///
/// Records are handled strictly one after another. Each record's update is
/// committed on its own; a failure stops the run but leaves earlier commits
/// in place.
pub struct ReconciliationService {
    repo: Arc<dyn PartRepository>,
    mode: RunMode,
}

impl ReconciliationService {
    pub fn new(repo: Arc<dyn PartRepository>, mode: RunMode) -> Self {
        Self { repo, mode }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Look the record's key up and classify key and fields.
    ///
    /// A key on any column other than [`KEY_DISCRIMINATOR`] is rejected
    /// before touching the store.
    pub async fn validate(&self, record: ReconciliationRecord) -> Result<ReconciliationRecord> {
        ensure!(
            record.key().is_supported(),
            "Only {} is supported as a key column, got {}",
            KEY_DISCRIMINATOR,
            record.key().column
        );

        let matches = self
            .repo
            .find_matches(record.key(), &record.field_columns())
            .await
            .with_context(|| format!("Lookup failed for key {}", record.key().value))?;

        Ok(record.validated(&matches))
    }

    /// Write the updateable fields of an eligible record.
    ///
    /// Ineligible records, and eligible ones with nothing to write, come back
    /// unchanged without touching the store.
    pub async fn submit(&self, record: ReconciliationRecord) -> Result<ReconciliationRecord> {
        if !record.is_eligible() {
            return Ok(record);
        }
        let changes = record.updateable_fields();
        if changes.is_empty() {
            debug!(key = %record.key().value, "nothing to write");
            return Ok(record);
        }
        let Some(table) = record.table().cloned() else {
            return Ok(record);
        };

        self.repo
            .apply_update(&table, record.key(), &changes)
            .await
            .with_context(|| {
                format!(
                    "Update failed for key {} in {}",
                    record.key().value,
                    table
                )
            })?;

        let written: Vec<ColumnName> = changes.into_iter().map(|c| c.column).collect();
        info!(
            key = %record.key().value,
            table = %table,
            fields = written.len(),
            "record updated"
        );
        Ok(record.updated(&written))
    }

    /// Validate one record and, in commit mode, submit it.
    pub async fn process(&self, record: ReconciliationRecord) -> Result<ReconciliationRecord> {
        let record = self.validate(record).await?;

        let mismatches = record.mismatch_count();
        if mismatches > 0 {
            warn!(
                key = %record.key().value,
                mismatches,
                "record blocked by mismatching fields"
            );
        }

        if self.mode.is_commit() {
            self.submit(record).await
        } else {
            Ok(record)
        }
    }

    /// Process `records` in order, handing each final record to `on_record`
    /// before the next one is read.
    ///
    /// The first error, whether from the input, the store or `on_record`,
    /// ends the run.
    pub async fn run<I, F>(&self, records: I, mut on_record: F) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<ReconciliationRecord>>,
        F: FnMut(&ReconciliationRecord) -> Result<()>,
    {
        let mut summary = RunSummary::new(self.mode);
        for record in records {
            let record = self.process(record?).await?;
            summary.tally(&record);
            on_record(&record)?;
        }
        info!(
            records = summary.records,
            updated = summary.updated,
            mode = %self.mode,
            "run completed"
        );
        Ok(summary)
    }
}
