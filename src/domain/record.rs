use anyhow::{bail, Result};

use crate::domain::classification::{
    classify_field, classify_key, FieldClassification, FieldStatus, KeyClassification,
};
use crate::domain::row_match::RowMatch;
use crate::domain::value_objects::{ColumnName, FieldTarget, Key, TableName};

/// Field statuses that are written on submit. Other statuses may still allow
/// the record through the eligibility check but are left untouched.
pub const UPDATEABLE: &[FieldStatus] = &[FieldStatus::Empty];

#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub column: ColumnName,
    pub target: String,
    pub classification: FieldClassification,
}

/// One input row on its way through validation and (optionally) submission.
///
/// Every step consumes the record and hands back the next state, so a
/// classification, once computed, can only be replaced by its terminal
/// `Updated` form.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationRecord {
    key: Key,
    fields: Vec<FieldState>,
    key_status: KeyClassification,
    table: Option<TableName>,
}

impl ReconciliationRecord {
    /// Build an unvalidated record. Field columns must be unique.
    pub fn new(key: Key, targets: Vec<FieldTarget>) -> Result<Self> {
        let mut fields: Vec<FieldState> = Vec::with_capacity(targets.len());
        for t in targets {
            if fields.iter().any(|f| f.column == t.column) {
                bail!(
                    "Field {} given twice for key {}",
                    t.column,
                    key.value
                );
            }
            fields.push(FieldState {
                column: t.column,
                target: t.value,
                classification: FieldClassification::unknown(),
            });
        }
        Ok(Self {
            key,
            fields,
            key_status: KeyClassification::Unknown,
            table: None,
        })
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn key_status(&self) -> &KeyClassification {
        &self.key_status
    }

    /// Set once the key resolved to a single row.
    pub fn table(&self) -> Option<&TableName> {
        self.table.as_ref()
    }

    pub fn fields(&self) -> &[FieldState] {
        &self.fields
    }

    pub fn field_columns(&self) -> Vec<ColumnName> {
        self.fields.iter().map(|f| f.column.clone()).collect()
    }

    pub fn is_validated(&self) -> bool {
        self.key_status != KeyClassification::Unknown
    }

    /// Classify the key from `matches` and, when it is unique, every field
    /// against the matched row. A record is validated at most once; calling
    /// this again returns it unchanged.
    pub fn validated(self, matches: &[RowMatch]) -> Self {
        if self.is_validated() {
            return self;
        }

        let key_status = classify_key(matches);
        let row = match (&key_status, matches.first()) {
            (KeyClassification::Unique, Some(row)) => row,
            _ => {
                return Self {
                    key_status,
                    ..self
                }
            }
        };

        let fields = self
            .fields
            .into_iter()
            .map(|f| FieldState {
                classification: classify_field(row.field(&f.column), &f.target),
                ..f
            })
            .collect();

        Self {
            key: self.key,
            fields,
            key_status,
            table: Some(row.table.clone()),
        }
    }

    /// Hard requirements for an update: the key is unique and every field is
    /// either empty or already holds the target value.
    pub fn is_eligible(&self) -> bool {
        self.key_status == KeyClassification::Unique
            && self.fields.iter().all(|f| {
                !matches!(
                    f.classification.status,
                    FieldStatus::Unknown | FieldStatus::Mismatch
                )
            })
    }

    /// Fields a submit would write, in input order.
    pub fn updateable_fields(&self) -> Vec<FieldTarget> {
        self.fields
            .iter()
            .filter(|f| UPDATEABLE.contains(&f.classification.status))
            .map(|f| FieldTarget {
                column: f.column.clone(),
                value: f.target.clone(),
            })
            .collect()
    }

    /// Mark the key and the `written` fields as updated.
    pub fn updated(self, written: &[ColumnName]) -> Self {
        let fields = self
            .fields
            .into_iter()
            .map(|f| {
                if written.contains(&f.column) && UPDATEABLE.contains(&f.classification.status) {
                    FieldState {
                        classification: f.classification.into_updated(),
                        ..f
                    }
                } else {
                    f
                }
            })
            .collect();

        Self {
            key: self.key,
            fields,
            key_status: KeyClassification::Updated,
            table: self.table,
        }
    }

    pub fn mismatch_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.classification.status == FieldStatus::Mismatch)
            .count()
    }
}
