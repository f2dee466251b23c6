use anyhow::Result;
use serde_json::{json, Value};
use sqlx::any::AnyRow;
use sqlx::{Row, TypeInfo, ValueRef};

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// SQL dialect: query building and literal formatting.
///
/// Implemented per driver. Used by both the infrastructure query builders
/// and the presentation SQL writer — the interface is pure string manipulation
/// with no sqlx dependency, so it crosses the layer boundary cleanly.
pub trait QueryDialect: Send + Sync {
    /// Return the driver name as a lowercase string ("postgres", "mysql", …).
    /// Used for output metadata (SQL script header) only —
    /// never for branching logic (use the other methods for that).
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, schema) per dialect.
    /// - MySQL / MariaDB → backtick: `` `col` ``
    /// - PostgreSQL / SQLite → double-quote: `"col"`
    fn quote_ident(&self, s: &str) -> String;

    /// Return the `schema.` prefix for a qualified table reference.
    /// SQLite has no schema namespace, so it returns `""`.
    fn schema_prefix(&self, schema: &str) -> String {
        format!("{}.", self.quote_ident(schema))
    }

    /// Bind parameter marker for the `n`-th (1-based) parameter.
    /// - PostgreSQL → `$n`
    /// - MySQL / MariaDB / SQLite → `?`
    fn placeholder(&self, _n: usize) -> String {
        "?".to_string()
    }

    /// Format a string as a single-quoted SQL literal.
    fn sql_literal(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    /// Wrap `expr` in a cast to the dialect's text type, so constant
    /// columns come back as text rather than an untyped value.
    fn text_cast(&self, expr: &str) -> String {
        format!("CAST({} AS TEXT)", expr)
    }
}

/// Row decoder: read a single `AnyRow` column into a `serde_json::Value`.
///
/// Implemented per driver. Lives in infrastructure only — callers outside
/// this module receive `Value`s, never raw `AnyRow`s.
pub trait RowDecoder: Send + Sync {
    /// Decode the column at `idx`, using the runtime type of the value to
    /// pick the correct `Value` variant. The declared column type is not
    /// reliable: SQLite reports `NULL` for expressions and untyped columns.
    fn decode_column(&self, row: &AnyRow, idx: usize) -> Result<Value> {
        let type_name = value_type_name(row, idx)?;
        col_to_json(row, idx, &type_name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ─────────────────────────────────────────────────────────────────────────────

pub struct PostgresDialect;

impl QueryDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_ident(&self, s: &str) -> String {
        format!("\"{}\"", s.replace('"', "\"\""))
    }

    fn placeholder(&self, n: usize) -> String {
        format!("${}", n)
    }

}

impl RowDecoder for PostgresDialect {}

// ─────────────────────────────────────────────────────────────────────────────
// MySQL / MariaDB
// ─────────────────────────────────────────────────────────────────────────────

pub struct MysqlDialect;

impl QueryDialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, s: &str) -> String {
        format!("`{}`", s.replace('`', "``"))
    }

    fn text_cast(&self, expr: &str) -> String {
        format!("CAST({} AS CHAR)", expr)
    }
}

impl RowDecoder for MysqlDialect {
    fn decode_column(&self, row: &AnyRow, idx: usize) -> Result<Value> {
        // Literal string columns (such as the table tag of the lookup) and
        // some VARCHARs arrive as BLOB through AnyRow. Read raw bytes instead.
        let anyrow_type = value_type_name(row, idx)?;
        if anyrow_type == "BLOB" {
            blob_to_json(row, idx)
        } else {
            col_to_json(row, idx, &anyrow_type)
        }
    }
}

// MariaDB shares MySQL's wire protocol and AnyRow behaviour.
pub struct MariadbDialect;

impl QueryDialect for MariadbDialect {
    fn name(&self) -> &'static str {
        "mariadb"
    }

    fn quote_ident(&self, s: &str) -> String {
        MysqlDialect.quote_ident(s)
    }

    fn text_cast(&self, expr: &str) -> String {
        MysqlDialect.text_cast(expr)
    }
}

impl RowDecoder for MariadbDialect {
    fn decode_column(&self, row: &AnyRow, idx: usize) -> Result<Value> {
        MysqlDialect.decode_column(row, idx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite
// ─────────────────────────────────────────────────────────────────────────────

pub struct SqliteDialect;

impl QueryDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_ident(&self, s: &str) -> String {
        format!("\"{}\"", s.replace('"', "\"\""))
    }

    fn schema_prefix(&self, _schema: &str) -> String {
        // SQLite has no schema namespace
        String::new()
    }
}

impl RowDecoder for SqliteDialect {}

// ─────────────────────────────────────────────────────────────────────────────
// Factory
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve the dialect pair (QueryDialect + RowDecoder) from a driver name string.
/// Returns `Box<dyn Dialect>` where `Dialect` is the combined supertrait alias.
pub fn from_driver(driver: &str) -> Box<dyn Dialect> {
    match driver {
        "postgres" => Box::new(PostgresDialect),
        "mysql" => Box::new(MysqlDialect),
        "mariadb" => Box::new(MariadbDialect),
        _ => Box::new(SqliteDialect),
    }
}

/// Combined supertrait — convenience alias so callers only store one object.
pub trait Dialect: QueryDialect + RowDecoder {}
impl Dialect for PostgresDialect {}
impl Dialect for MysqlDialect {}
impl Dialect for MariadbDialect {}
impl Dialect for SqliteDialect {}

// ─────────────────────────────────────────────────────────────────────────────
// Shared decoding helpers (private to this module)
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime type of the value at `idx`, `"NULL"` for SQL `NULL`.
fn value_type_name(row: &AnyRow, idx: usize) -> Result<String> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok("NULL".to_string());
    }
    Ok(raw.type_info().name().to_string())
}

/// Best-effort decode of a value whose type is unknown: text first, then
/// integer, then float.
fn untyped_to_json(row: &AnyRow, idx: usize) -> Value {
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(idx) {
        return Value::String(s);
    }
    if let Ok(Some(i)) = row.try_get::<Option<i64>, _>(idx) {
        return json!(i);
    }
    if let Ok(Some(f)) = row.try_get::<Option<f64>, _>(idx) {
        return json!(f);
    }
    Value::Null
}

/// Decode a BLOB column (MySQL/MariaDB text returned as bytes) as UTF-8.
fn blob_to_json(row: &AnyRow, idx: usize) -> Result<Value> {
    let bytes: Option<Vec<u8>> = row.try_get(idx)?;
    Ok(bytes.map_or(Value::Null, |b| {
        Value::String(String::from_utf8_lossy(&b).into_owned())
    }))
}

/// Decode a column according to its `AnyRow` type name.
fn col_to_json(row: &AnyRow, idx: usize, type_name: &str) -> Result<Value> {
    let v = match type_name.to_uppercase().as_str() {
        "NULL" => untyped_to_json(row, idx),

        // ── Booleans ──────────────────────────────────────────────────────────
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(idx)?
            .map_or(Value::Null, Value::Bool),

        // ── Integers ──────────────────────────────────────────────────────────
        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(idx)?
            .map_or(Value::Null, |v| json!(v)),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(idx)?
            .map_or(Value::Null, |v| json!(v)),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(idx)?
            .map_or(Value::Null, |v| json!(v)),

        // ── Floats ────────────────────────────────────────────────────────────
        "FLOAT4" | "REAL" | "FLOAT" => row
            .try_get::<Option<f32>, _>(idx)?
            .map_or(Value::Null, |v| json!(v as f64)),

        "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(idx)?
            .map_or(Value::Null, |v| json!(v)),

        "BLOB" | "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(idx)?
            .map_or(Value::Null, |b| {
                Value::String(String::from_utf8_lossy(&b).into_owned())
            }),

        // ── Everything else: TEXT, VARCHAR, CHAR …
        _ => row
            .try_get::<Option<String>, _>(idx)?
            .map_or(Value::Null, Value::String),
    };
    Ok(v)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
