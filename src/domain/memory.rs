use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

use crate::domain::ports::PartRepository;
use crate::domain::row_match::{RowMap, RowMatch};
use crate::domain::value_objects::{ColumnName, FieldTarget, Key, TableName};

/// In-memory implementation of [`PartRepository`].
///
/// Holds `table name → rows` in the order tables were added; lookups scan
/// tables in that order, mirroring the federated query of the SQL backend.
/// Every successful `apply_update` is also appended to a write log.
#[derive(Default)]
pub struct InMemoryPartRepository {
    tables: Mutex<Vec<(TableName, Vec<RowMap>)>>,
    writes: Mutex<Vec<(TableName, Key, Vec<FieldTarget>)>>,
}

impl InMemoryPartRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `rows` to `table`, creating it if needed.
    pub fn with_rows(self, table: &str, rows: Vec<RowMap>) -> Self {
        if let Ok(mut tables) = self.tables.lock() {
            match tables.iter_mut().find(|(t, _)| t.0 == table) {
                Some((_, existing)) => existing.extend(rows),
                None => tables.push((TableName(table.to_string()), rows)),
            }
        }
        self
    }

    /// Updates applied so far, oldest first.
    pub fn writes(&self) -> Vec<(TableName, Key, Vec<FieldTarget>)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Current rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<RowMap> {
        self.tables
            .lock()
            .ok()
            .and_then(|tables| {
                tables
                    .iter()
                    .find(|(t, _)| t.0 == table)
                    .map(|(_, rows)| rows.clone())
            })
            .unwrap_or_default()
    }
}

fn key_matches(row: &RowMap, key: &Key) -> bool {
    match row.get(&key.column.0) {
        Some(Value::String(s)) => *s == key.value,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == key.value,
    }
}

#[async_trait]
impl PartRepository for InMemoryPartRepository {
    async fn find_matches(&self, key: &Key, fields: &[ColumnName]) -> Result<Vec<RowMatch>> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| anyhow!("in-memory store poisoned"))?;

        let mut matches = Vec::new();
        for (table, rows) in tables.iter() {
            for row in rows.iter().filter(|r| key_matches(r, key)) {
                matches.push(RowMatch {
                    table: table.clone(),
                    key_value: row.get(&key.column.0).cloned().unwrap_or(Value::Null),
                    fields: fields
                        .iter()
                        .map(|c| (c.0.clone(), row.get(&c.0).cloned().unwrap_or(Value::Null)))
                        .collect(),
                });
            }
        }
        Ok(matches)
    }

    async fn apply_update(
        &self,
        table: &TableName,
        key: &Key,
        changes: &[FieldTarget],
    ) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| anyhow!("in-memory store poisoned"))?;

        let rows = tables
            .iter_mut()
            .find(|(t, _)| t == table)
            .map(|(_, rows)| rows)
            .ok_or_else(|| anyhow!("Unknown table {}", table))?;

        for row in rows.iter_mut().filter(|r| key_matches(r, key)) {
            for change in changes {
                row.insert(change.column.0.clone(), Value::String(change.value.clone()));
            }
        }

        self.writes
            .lock()
            .map_err(|_| anyhow!("in-memory store poisoned"))?
            .push((table.clone(), key.clone(), changes.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn part(num: &str, bionum: Value) -> RowMap {
        [
            ("MANUPARTNUM".to_string(), json!(num)),
            ("INT_BIONUM".to_string(), bionum),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn finds_across_tables_in_insertion_order() {
        let repo = InMemoryPartRepository::new()
            .with_rows("RESISTOR", vec![part("ABC123", Value::Null)])
            .with_rows("IC", vec![part("OTHER", Value::Null)])
            .with_rows("CAPACITOR", vec![part("ABC123", json!("BIO-1"))]);

        let found = repo
            .find_matches(
                &Key::part_number("ABC123"),
                &[ColumnName("INT_BIONUM".into())],
            )
            .await
            .unwrap();

        let tables: Vec<_> = found.iter().map(|m| m.table.0.as_str()).collect();
        assert_eq!(tables, ["RESISTOR", "CAPACITOR"]);
        assert_eq!(found[1].fields["INT_BIONUM"], json!("BIO-1"));
    }

    #[tokio::test]
    async fn update_rewrites_row_and_logs_write() {
        let repo = InMemoryPartRepository::new().with_rows("IC", vec![part("ABC123", Value::Null)]);
        let key = Key::part_number("ABC123");

        repo.apply_update(
            &TableName("IC".into()),
            &key,
            &[FieldTarget::new("INT_BIONUM", "BIO-5")],
        )
        .await
        .unwrap();

        assert_eq!(repo.rows("IC")[0]["INT_BIONUM"], json!("BIO-5"));
        assert_eq!(repo.writes().len(), 1);
    }

    #[tokio::test]
    async fn update_on_unknown_table_fails() {
        let repo = InMemoryPartRepository::new();
        let err = repo
            .apply_update(&TableName("NOPE".into()), &Key::part_number("X"), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("NOPE"));
    }
}
