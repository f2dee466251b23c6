use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::classification::{FieldStatus, KeyClassification};
use crate::domain::record::ReconciliationRecord;

/// Whether eligible records are written back or only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    DryRun,
    Commit,
}

impl RunMode {
    pub fn from_commit_flag(commit: bool) -> Self {
        if commit {
            RunMode::Commit
        } else {
            RunMode::DryRun
        }
    }

    pub fn is_commit(self) -> bool {
        self == RunMode::Commit
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::DryRun => f.write_str("dry-run"),
            RunMode::Commit => f.write_str("commit"),
        }
    }
}

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub mode: RunMode,
    pub created_at: String,
    pub records: usize,
    pub missing: usize,
    pub duplicates: usize,
    /// Keys that resolved to a single row but were not written.
    pub unique: usize,
    pub updated: usize,
    pub eligible: usize,
    pub mismatched_fields: usize,
    pub written_fields: usize,
}

impl RunSummary {
    pub fn new(mode: RunMode) -> Self {
        RunSummary {
            run_id: format!(
                "run_{}_{}",
                Utc::now().format("%Y%m%d_%H%M%S"),
                Uuid::new_v4().simple()
            ),
            mode,
            created_at: Utc::now().to_rfc3339(),
            records: 0,
            missing: 0,
            duplicates: 0,
            unique: 0,
            updated: 0,
            eligible: 0,
            mismatched_fields: 0,
            written_fields: 0,
        }
    }

    /// Account for a record once it has reached its final state.
    pub fn tally(&mut self, record: &ReconciliationRecord) {
        self.records += 1;
        match record.key_status() {
            KeyClassification::Missing => self.missing += 1,
            KeyClassification::Duplicates { .. } => self.duplicates += 1,
            KeyClassification::Unique => self.unique += 1,
            KeyClassification::Updated => self.updated += 1,
            KeyClassification::Unknown => {}
        }
        if record.is_eligible() || *record.key_status() == KeyClassification::Updated {
            self.eligible += 1;
        }
        self.mismatched_fields += record.mismatch_count();
        self.written_fields += record
            .fields()
            .iter()
            .filter(|f| f.classification.status == FieldStatus::Updated)
            .count();
    }
}
