use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::ports::PartRepository;
use crate::domain::row_match::RowMatch;
use crate::domain::value_objects::{ColumnName, FieldTarget, Key, TableName};
use crate::infrastructure::config::{AppConfig, DbConfig};
use crate::infrastructure::db::dialect::{from_driver, Dialect};
use crate::infrastructure::db::row_mapper::row_to_match;
use crate::infrastructure::db::sql_utils::{build_lookup_query, build_update_query};

/// Parts library backed by a single sqlx connection.
///
/// The connection is opened by [`connect`] and must be released with
/// [`SqlxPartRepository::close`] once the run is over.
pub struct SqlxPartRepository {
    pool: AnyPool,
    dialect: Arc<dyn Dialect>,
    schema: Option<String>,
    tables: Vec<TableName>,
}

/// Connect to the database described in `cfg` and return a `SqlxPartRepository`
/// searching the configured lookup tables.
pub async fn connect(cfg: &AppConfig) -> Result<SqlxPartRepository> {
    let db: &DbConfig = &cfg.database;
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect(&db.url())
        .await
        .with_context(|| format!("Failed to connect to {} (driver: {})", db.dbname, db.driver))?;

    debug!("Connected to {}/{} via {} driver", db.host, db.dbname, db.driver);

    Ok(SqlxPartRepository {
        pool,
        dialect: Arc::from(from_driver(&db.driver)),
        schema: db.schema.clone(),
        tables: cfg
            .lookup
            .tables
            .iter()
            .map(|t| TableName(t.clone()))
            .collect(),
    })
}

impl SqlxPartRepository {
    /// Close the connection. Safe to call more than once.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Connection closed");
    }
}

#[async_trait]
impl PartRepository for SqlxPartRepository {
    async fn find_matches(&self, key: &Key, fields: &[ColumnName]) -> Result<Vec<RowMatch>> {
        let query = build_lookup_query(
            self.schema.as_deref(),
            &self.tables,
            &key.column,
            fields,
            self.dialect.as_ref(),
        );

        debug!("Executing: {}", query);

        let mut q = sqlx::query(&query);
        for _ in &self.tables {
            q = q.bind(key.value.clone());
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to look up {} = {}", key.column, key.value))?;

        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            result.push(row_to_match(row, &key.column, self.dialect.as_ref())?);
        }
        Ok(result)
    }

    async fn apply_update(
        &self,
        table: &TableName,
        key: &Key,
        changes: &[FieldTarget],
    ) -> Result<()> {
        let set_cols: Vec<ColumnName> = changes.iter().map(|c| c.column.clone()).collect();
        let query = build_update_query(
            self.schema.as_deref(),
            table,
            &key.column,
            &set_cols,
            self.dialect.as_ref(),
        );

        debug!("Executing: {}", query);

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open transaction")?;

        let mut q = sqlx::query(&query);
        for change in changes {
            q = q.bind(change.value.clone());
        }
        let result = q
            .bind(key.value.clone())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to update {} in {}", key.value, table))?;

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit update of {} in {}", key.value, table))?;

        if result.rows_affected() == 0 {
            warn!(key = %key.value, table = %table, "update matched no changed rows");
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::application::reconcile::ReconciliationService;
    use crate::domain::classification::{FieldStatus, KeyClassification};
    use crate::domain::record::ReconciliationRecord;
    use crate::domain::summary::RunMode;
    use serde_json::json;
    use sqlx::Row;

    // IC is declared without column types, which SQLite reports as NULL.
    const SCHEMA: &[&str] = &[
        r#"CREATE TABLE "RESISTOR" (MANUPARTNUM TEXT, INT_BIONUM TEXT, DATASHEET TEXT)"#,
        r#"CREATE TABLE "IC" (MANUPARTNUM, INT_BIONUM, DATASHEET)"#,
        r#"CREATE TABLE "CAPACITOR" (MANUPARTNUM VARCHAR(64), INT_BIONUM VARCHAR(64), DATASHEET VARCHAR(64))"#,
        r#"INSERT INTO "RESISTOR" VALUES ('DUP-1', NULL, NULL)"#,
        r#"INSERT INTO "CAPACITOR" VALUES ('DUP-1', NULL, NULL)"#,
        r#"INSERT INTO "IC" VALUES ('ABC123', NULL, 'SHEET-1')"#,
        r#"INSERT INTO "IC" VALUES ('XYZ789', 'BIO-9', 'SHEET-1')"#,
    ];

    async fn library(dir: &tempfile::TempDir) -> SqlxPartRepository {
        let path = dir.path().join("parts.db");
        std::fs::File::create(&path).unwrap();

        let mut cfg = AppConfig::default();
        cfg.database.dbname = path.to_string_lossy().into_owned();
        cfg.lookup.tables = vec!["RESISTOR".into(), "IC".into(), "CAPACITOR".into()];

        let repo = connect(&cfg).await.unwrap();
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&repo.pool).await.unwrap();
        }
        repo
    }

    fn record(num: &str, bionum: &str, datasheet: &str) -> ReconciliationRecord {
        ReconciliationRecord::new(
            Key::part_number(num),
            vec![
                FieldTarget::new("INT_BIONUM", bionum),
                FieldTarget::new("DATASHEET", datasheet),
            ],
        )
        .unwrap()
    }

    fn status_of(rec: &ReconciliationRecord, col: &str) -> FieldStatus {
        rec.fields()
            .iter()
            .find(|f| f.column.0 == col)
            .unwrap()
            .classification
            .status
    }

    fn fields() -> Vec<ColumnName> {
        vec![
            ColumnName("INT_BIONUM".into()),
            ColumnName("DATASHEET".into()),
        ]
    }

    #[tokio::test]
    async fn unknown_key_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = library(&dir).await;

        let found = repo
            .find_matches(&Key::part_number("NOPE-1"), &fields())
            .await
            .unwrap();

        assert!(found.is_empty());
        repo.close().await;
    }

    #[tokio::test]
    async fn lookup_tags_rows_with_table_names_in_config_order() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(library(&dir).await);

        let found = repo
            .find_matches(&Key::part_number("DUP-1"), &fields())
            .await
            .unwrap();
        let tables: Vec<_> = found.iter().map(|m| m.table.0.as_str()).collect();
        assert_eq!(tables, ["RESISTOR", "CAPACITOR"]);

        let svc = ReconciliationService::new(repo.clone(), RunMode::Commit);
        let rec = svc.process(record("DUP-1", "BIO-1", "S")).await.unwrap();
        assert_eq!(rec.key_status().comment(), "Tables: RESISTOR,CAPACITOR");
        repo.close().await;
    }

    #[tokio::test]
    async fn untyped_columns_keep_their_values() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(library(&dir).await);

        let found = repo
            .find_matches(&Key::part_number("XYZ789"), &fields())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].table, TableName("IC".into()));
        assert_eq!(found[0].key_value, json!("XYZ789"));
        assert_eq!(found[0].fields["INT_BIONUM"], json!("BIO-9"));

        let svc = ReconciliationService::new(repo.clone(), RunMode::Commit);
        let rec = svc.process(record("XYZ789", "BIO-7", "SHEET-1")).await.unwrap();
        assert_eq!(rec.key_status(), &KeyClassification::Unique);
        assert_eq!(status_of(&rec, "INT_BIONUM"), FieldStatus::Mismatch);
        repo.close().await;
    }

    #[tokio::test]
    async fn commit_writes_empty_field_and_second_run_matches() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(library(&dir).await);
        let svc = ReconciliationService::new(repo.clone(), RunMode::Commit);

        let first = svc.process(record("ABC123", "BIO-5", "sheet-1")).await.unwrap();
        assert_eq!(first.key_status(), &KeyClassification::Updated);
        assert_eq!(first.table(), Some(&TableName("IC".into())));
        assert_eq!(status_of(&first, "INT_BIONUM"), FieldStatus::Updated);
        assert_eq!(status_of(&first, "DATASHEET"), FieldStatus::Matches);

        let row = sqlx::query(r#"SELECT INT_BIONUM, DATASHEET FROM "IC" WHERE MANUPARTNUM = 'ABC123'"#)
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(row.try_get::<String, _>(0).unwrap(), "BIO-5");
        assert_eq!(row.try_get::<String, _>(1).unwrap(), "SHEET-1");

        let second = svc.process(record("ABC123", "BIO-5", "sheet-1")).await.unwrap();
        assert_eq!(second.key_status(), &KeyClassification::Unique);
        assert_eq!(status_of(&second, "INT_BIONUM"), FieldStatus::Matches);
        repo.close().await;
    }

    #[tokio::test]
    async fn row_without_text_tag_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let repo = library(&dir).await;

        let row = sqlx::query(r#"SELECT 1 AS "TABLE_NAME", 'X' AS "MANUPARTNUM""#)
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        let err = row_to_match(&row, &ColumnName("MANUPARTNUM".into()), repo.dialect.as_ref())
            .unwrap_err();
        assert!(err.to_string().contains("TABLE_NAME"), "{}", err);
        repo.close().await;
    }

    #[tokio::test]
    async fn closed_repository_refuses_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let repo = library(&dir).await;
        repo.close().await;
        repo.close().await;

        let result = repo.find_matches(&Key::part_number("ABC123"), &fields()).await;
        assert!(result.is_err());
    }
}
