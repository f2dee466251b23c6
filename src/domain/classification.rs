use serde_json::Value;

use crate::domain::row_match::RowMatch;
use crate::domain::value_objects::TableName;

// ─── Key ─────────────────────────────────────────────────────────────────────

/// Outcome of looking a key up across all configured tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyClassification {
    /// Not yet looked up.
    Unknown,
    /// No table holds the key.
    Missing,
    /// More than one row holds the key. `tables` lists each distinct table
    /// once, in the order its first match was returned.
    Duplicates { tables: Vec<TableName> },
    /// Exactly one row holds the key.
    Unique,
    /// Terminal: an update was written and committed for this key.
    Updated,
}

impl KeyClassification {
    pub fn label(&self) -> &'static str {
        match self {
            KeyClassification::Unknown => "UNKNOWN",
            KeyClassification::Missing => "MISSING",
            KeyClassification::Duplicates { .. } => "DUPLICATES",
            KeyClassification::Unique => "UNIQUE",
            KeyClassification::Updated => "UPDATED",
        }
    }

    /// Free-text detail shown next to the status in the report.
    pub fn comment(&self) -> String {
        match self {
            KeyClassification::Duplicates { tables } => format!(
                "Tables: {}",
                tables
                    .iter()
                    .map(|t| t.0.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            _ => String::new(),
        }
    }
}

impl std::fmt::Display for KeyClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a key from the rows the lookup returned for it.
pub fn classify_key(matches: &[RowMatch]) -> KeyClassification {
    match matches.len() {
        0 => KeyClassification::Missing,
        1 => KeyClassification::Unique,
        _ => {
            let mut tables: Vec<TableName> = Vec::new();
            for m in matches {
                if !tables.contains(&m.table) {
                    tables.push(m.table.clone());
                }
            }
            KeyClassification::Duplicates { tables }
        }
    }
}

// ─── Field ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldStatus {
    Unknown,
    /// Existing value absent; safe to write.
    Empty,
    /// Existing value equals the target ignoring case, or both are blank;
    /// nothing to write.
    Matches,
    /// Existing value differs from the target; never overwritten.
    Mismatch,
    /// Terminal: the target value was written.
    Updated,
}

impl FieldStatus {
    pub fn label(self) -> &'static str {
        match self {
            FieldStatus::Unknown => "UNKNOWN",
            FieldStatus::Empty => "EMPTY",
            FieldStatus::Matches => "MATCHES",
            FieldStatus::Mismatch => "MISMATCH",
            FieldStatus::Updated => "UPDATED",
        }
    }
}

impl std::fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification of one target field against the existing row.
///
/// `existing` is the value found in the database (the destination of a
/// write), `target` the value supplied by the input record (its source).
/// Both stay `None` while the field is [`FieldStatus::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldClassification {
    pub status: FieldStatus,
    pub existing: Option<String>,
    pub target: Option<String>,
}

impl FieldClassification {
    pub fn unknown() -> Self {
        Self {
            status: FieldStatus::Unknown,
            existing: None,
            target: None,
        }
    }

    /// Same values, terminal status.
    pub fn into_updated(self) -> Self {
        Self {
            status: FieldStatus::Updated,
            ..self
        }
    }
}

impl Default for FieldClassification {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Classify one field given the value currently stored and the value wanted.
pub fn classify_field(existing: &Value, target: &str) -> FieldClassification {
    let existing = value_text(existing);
    let status = match &existing {
        // Blank wanted, nothing stored: writing would never settle.
        None if target.is_empty() => FieldStatus::Matches,
        None => FieldStatus::Empty,
        Some(current) if current.to_uppercase() == target.to_uppercase() => FieldStatus::Matches,
        Some(_) => FieldStatus::Mismatch,
    };
    FieldClassification {
        status,
        existing,
        target: Some(target.to_string()),
    }
}

/// Textual form of a stored value, or `None` when the column holds nothing.
///
/// Non-string values are compared through their text rendering: numbers in
/// decimal, booleans as `true`/`false`, JSON documents serialised.
pub fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(v).ok(),
    }
}
