use crate::domain::value_objects::{ColumnName, TableName};
use crate::infrastructure::db::dialect::QueryDialect;

/// Column carrying the source table of each lookup row.
pub const TABLE_TAG: &str = "TABLE_NAME";

/// Column carrying the position of the source table in the lookup list.
pub const TABLE_ORDER: &str = "TABLE_ORDER";

// ─────────────────────────────────────────────────────────────────────────────
// Query builders
// ─────────────────────────────────────────────────────────────────────────────

/// Build the federated lookup: one `SELECT` per table, joined with
/// `UNION ALL`, each tagging its rows with the table name and filtering on
/// `key_col`. The key is bound once per table, so the query takes exactly
/// `tables.len()` parameters.
///
/// ```text
/// SELECT CAST('IC' AS TEXT) AS "TABLE_NAME", 0 AS "TABLE_ORDER", "MANUPARTNUM", "INT_BIONUM"
///   FROM "IC" WHERE "MANUPARTNUM" = ?
/// UNION ALL
/// ...
/// ORDER BY "TABLE_ORDER"
/// ```
pub fn build_lookup_query<D: QueryDialect + ?Sized>(
    schema: Option<&str>,
    tables: &[TableName],
    key_col: &ColumnName,
    fields: &[ColumnName],
    dialect: &D,
) -> String {
    let prefix = schema.map(|s| dialect.schema_prefix(s)).unwrap_or_default();
    let key_q = dialect.quote_ident(&key_col.0);
    let columns: Vec<String> = std::iter::once(key_q.clone())
        .chain(fields.iter().map(|c| dialect.quote_ident(&c.0)))
        .collect();

    let branches: Vec<String> = tables
        .iter()
        .enumerate()
        .map(|(i, table)| {
            format!(
                "SELECT {} AS {}, {} AS {}, {}\n  FROM {}{} WHERE {} = {}",
                dialect.text_cast(&dialect.sql_literal(&table.0)),
                dialect.quote_ident(TABLE_TAG),
                i,
                dialect.quote_ident(TABLE_ORDER),
                columns.join(", "),
                prefix,
                dialect.quote_ident(&table.0),
                key_q,
                dialect.placeholder(i + 1)
            )
        })
        .collect();

    format!(
        "{}\nORDER BY {}",
        branches.join("\nUNION ALL\n"),
        dialect.quote_ident(TABLE_ORDER)
    )
}

/// Build `UPDATE <table> SET <col> = ?, … WHERE <key_col> = ?`.
/// Parameters are the new values in `set_cols` order, then the key.
pub fn build_update_query<D: QueryDialect + ?Sized>(
    schema: Option<&str>,
    table: &TableName,
    key_col: &ColumnName,
    set_cols: &[ColumnName],
    dialect: &D,
) -> String {
    let prefix = schema.map(|s| dialect.schema_prefix(s)).unwrap_or_default();
    let assignments: Vec<String> = set_cols
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = {}", dialect.quote_ident(&c.0), dialect.placeholder(i + 1)))
        .collect();

    format!(
        "UPDATE {}{} SET {} WHERE {} = {}",
        prefix,
        dialect.quote_ident(&table.0),
        assignments.join(", "),
        dialect.quote_ident(&key_col.0),
        dialect.placeholder(set_cols.len() + 1)
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
