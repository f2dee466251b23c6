use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::value_objects::{ColumnName, TableName};

/// Type alias for a database row represented as a sorted map of column name → JSON value.
pub type RowMap = BTreeMap<String, Value>;

/// One row returned by the lookup, tagged with the table it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMatch {
    pub table: TableName,
    pub key_value: Value,
    /// Requested field columns only. A column the backend did not return is
    /// treated the same as `NULL`.
    pub fields: RowMap,
}

impl RowMatch {
    pub fn field(&self, column: &ColumnName) -> &Value {
        self.fields.get(&column.0).unwrap_or(&Value::Null)
    }
}
