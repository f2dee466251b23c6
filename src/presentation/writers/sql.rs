use std::fmt::Write as FmtWrite;

use anyhow::Result;
use chrono::Utc;

use crate::domain::classification::{FieldStatus, KeyClassification};
use crate::domain::{ports::ReportWriter, record::ReconciliationRecord, summary::RunSummary};
use crate::infrastructure::config::DbConfig;
use crate::infrastructure::db::dialect::{from_driver, Dialect, QueryDialect};

/// Emits the `UPDATE` statements a run needs (dry run) or performed (commit).
///
/// Only eligible records with at least one empty field produce a statement.
/// Statements already executed by a commit run are prefixed with an
/// `-- applied` marker, so the script is a review aid, not something to
/// re-run.
pub struct SqlWriter {
    dialect: Box<dyn Dialect>,
    schema: Option<String>,
    statements: usize,
}

impl SqlWriter {
    pub fn new(db: &DbConfig) -> Self {
        Self {
            dialect: from_driver(&db.driver),
            schema: db.schema.clone(),
            statements: 0,
        }
    }
}

impl ReportWriter for SqlWriter {
    fn header(&mut self) -> Result<String> {
        self.statements = 0;
        let mut sql = String::new();
        writeln!(sql, "-- partsync update script")?;
        writeln!(sql, "-- Driver: {}", self.dialect.name())?;
        writeln!(sql, "-- Generated: {}", Utc::now().to_rfc3339())?;
        writeln!(sql)?;
        Ok(sql)
    }

    fn record(&mut self, record: &ReconciliationRecord) -> Result<String> {
        let applied = *record.key_status() == KeyClassification::Updated;
        let columns: Vec<(&str, &str)> = if applied {
            record
                .fields()
                .iter()
                .filter(|f| f.classification.status == FieldStatus::Updated)
                .map(|f| (f.column.0.as_str(), f.target.as_str()))
                .collect()
        } else if record.is_eligible() {
            record
                .fields()
                .iter()
                .filter(|f| f.classification.status == FieldStatus::Empty)
                .map(|f| (f.column.0.as_str(), f.target.as_str()))
                .collect()
        } else {
            Vec::new()
        };

        let Some(table) = record.table() else {
            return Ok(String::new());
        };
        if columns.is_empty() {
            return Ok(String::new());
        }

        self.statements += 1;
        let dialect = self.dialect.as_ref();
        let prefix = self
            .schema
            .as_deref()
            .map(|s| dialect.schema_prefix(s))
            .unwrap_or_default();

        let mut sql = String::new();
        if applied {
            writeln!(sql, "-- applied")?;
        }
        writeln!(
            sql,
            "UPDATE {}{}",
            prefix,
            dialect.quote_ident(&table.0)
        )?;
        writeln!(sql, "  SET {}", set_clause(&columns, dialect))?;
        writeln!(
            sql,
            "  WHERE {} = {};",
            dialect.quote_ident(&record.key().column.0),
            dialect.sql_literal(&record.key().value)
        )?;
        writeln!(sql)?;
        Ok(sql)
    }

    fn footer(&mut self, summary: &RunSummary) -> Result<String> {
        Ok(format!(
            "-- Summary: {} record(s), {} statement(s), {} applied ({})\n",
            summary.records, self.statements, summary.updated, summary.mode
        ))
    }

    fn extension(&self) -> &'static str {
        "sql"
    }
}

/// Build `SET col = 'val', ...` for the given (column, value) pairs.
pub(crate) fn set_clause<D: QueryDialect + ?Sized>(columns: &[(&str, &str)], dialect: &D) -> String {
    columns
        .iter()
        .map(|(col, val)| {
            format!(
                "{} = {}",
                dialect.quote_ident(col),
                dialect.sql_literal(val)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
