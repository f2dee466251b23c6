use anyhow::{anyhow, bail, Result};
use serde_json::Value;
use sqlx::any::AnyRow;
use sqlx::{Column, Row};
use std::collections::BTreeMap;

use crate::domain::row_match::RowMatch;
use crate::domain::value_objects::{ColumnName, TableName};
use crate::infrastructure::db::dialect::RowDecoder;
use crate::infrastructure::db::sql_utils::{TABLE_ORDER, TABLE_TAG};

/// Convert one row of the federated lookup into a `RowMatch`.
///
/// The `TABLE_NAME` tag becomes the match's table, `key_col` its key value,
/// and every other column (except the ordering helper) a field.
/// `decoder` is the dialect-specific `RowDecoder` that knows how to turn an
/// AnyRow column into the correct `serde_json::Value`.
pub fn row_to_match<D: RowDecoder + ?Sized>(
    row: &AnyRow,
    key_col: &ColumnName,
    decoder: &D,
) -> Result<RowMatch> {
    let mut table = None;
    let mut key_value = Value::Null;
    let mut fields = BTreeMap::new();

    for col in row.columns() {
        let name = col.name();
        if name == TABLE_ORDER {
            continue;
        }
        let value = decoder.decode_column(row, col.ordinal())?;
        if name == TABLE_TAG {
            match value {
                Value::String(s) => table = Some(TableName(s)),
                other => bail!("Lookup row has a non-text {} column: {}", TABLE_TAG, other),
            }
        } else if name == key_col.0 {
            key_value = value;
        } else {
            fields.insert(name.to_string(), value);
        }
    }

    let table = table.ok_or_else(|| anyhow!("Lookup row has no {} column", TABLE_TAG))?;
    Ok(RowMatch {
        table,
        key_value,
        fields,
    })
}
