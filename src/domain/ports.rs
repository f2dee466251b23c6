use crate::domain::{
    record::ReconciliationRecord,
    row_match::RowMatch,
    summary::RunSummary,
    value_objects::{ColumnName, FieldTarget, Key, TableName},
};
use anyhow::Result;
use async_trait::async_trait;

/// Port: access to the parts library (implemented by SqlxPartRepository)
#[async_trait]
pub trait PartRepository: Send + Sync {
    /// Every row, across all configured tables, whose key column equals
    /// `key.value`. Read-only; an empty result is not an error.
    async fn find_matches(&self, key: &Key, fields: &[ColumnName]) -> Result<Vec<RowMatch>>;

    /// Set `changes` on the row identified by `key` in `table` and commit.
    async fn apply_update(
        &self,
        table: &TableName,
        key: &Key,
        changes: &[FieldTarget],
    ) -> Result<()>;
}

/// Port: report formatting (implemented by LinesWriter, JsonWriter, SqlWriter)
pub trait ReportWriter: Send {
    /// Text emitted before the first record.
    fn header(&mut self) -> Result<String>;
    /// Text for one record in its final state.
    fn record(&mut self, record: &ReconciliationRecord) -> Result<String>;
    /// Text emitted once every record has been processed.
    fn footer(&mut self, summary: &RunSummary) -> Result<String>;
    /// Extension of the produced file (e.g. "csv", "json", "sql")
    fn extension(&self) -> &'static str;
}
