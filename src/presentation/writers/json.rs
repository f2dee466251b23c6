use anyhow::Result;
use serde::Serialize;

use crate::domain::{
    ports::ReportWriter, record::ReconciliationRecord, summary::RunSummary,
};

// ─── Serialisation view types ─────────────────────────────────────────────────
//
// Flattened, presentation-only shape of a record: statuses as their report
// labels plus the eligibility verdict. The domain types are never modified.

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a RunSummary,
    records: &'a [JsonRecord],
}

#[derive(Serialize)]
struct JsonRecord {
    key: String,
    key_column: String,
    key_status: &'static str,
    comment: String,
    table: Option<String>,
    eligible: bool,
    fields: Vec<JsonField>,
}

#[derive(Serialize)]
struct JsonField {
    column: String,
    status: &'static str,
    target: Option<String>,
    existing: Option<String>,
}

impl From<&ReconciliationRecord> for JsonRecord {
    fn from(r: &ReconciliationRecord) -> Self {
        JsonRecord {
            key: r.key().value.clone(),
            key_column: r.key().column.0.clone(),
            key_status: r.key_status().label(),
            comment: r.key_status().comment(),
            table: r.table().map(|t| t.0.clone()),
            eligible: r.is_eligible(),
            fields: r
                .fields()
                .iter()
                .map(|f| JsonField {
                    column: f.column.0.clone(),
                    status: f.classification.status.label(),
                    target: f.classification.target.clone(),
                    existing: f.classification.existing.clone(),
                })
                .collect(),
        }
    }
}

/// Collects every record and emits a single JSON document with the run
/// summary once the run is over.
#[derive(Default)]
pub struct JsonWriter {
    records: Vec<JsonRecord>,
}

impl ReportWriter for JsonWriter {
    fn header(&mut self) -> Result<String> {
        self.records.clear();
        Ok(String::new())
    }

    fn record(&mut self, record: &ReconciliationRecord) -> Result<String> {
        self.records.push(JsonRecord::from(record));
        Ok(String::new())
    }

    fn footer(&mut self, summary: &RunSummary) -> Result<String> {
        let doc = JsonReport {
            summary,
            records: &self.records,
        };
        let mut out = serde_json::to_string_pretty(&doc)?;
        out.push('\n');
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::row_match::{RowMap, RowMatch};
    use crate::domain::summary::RunMode;
    use crate::domain::value_objects::{FieldTarget, Key, TableName};
    use serde_json::{json, Value};

    #[test]
    fn document_holds_summary_and_records() {
        let rec = ReconciliationRecord::new(
            Key::part_number("ABC123"),
            vec![FieldTarget::new("INT_BIONUM", "BIO-5")],
        )
        .unwrap()
        .validated(&[RowMatch {
            table: TableName("IC".into()),
            key_value: json!("ABC123"),
            fields: RowMap::from([("INT_BIONUM".to_string(), Value::Null)]),
        }]);

        let mut w = JsonWriter::default();
        assert_eq!(w.header().unwrap(), "");
        assert_eq!(w.record(&rec).unwrap(), "");
        let mut summary = RunSummary::new(RunMode::DryRun);
        summary.tally(&rec);
        let doc: Value = serde_json::from_str(&w.footer(&summary).unwrap()).unwrap();

        assert_eq!(doc["summary"]["records"], json!(1));
        assert_eq!(doc["summary"]["mode"], json!("dry_run"));
        let r = &doc["records"][0];
        assert_eq!(r["key_status"], json!("UNIQUE"));
        assert_eq!(r["table"], json!("IC"));
        assert_eq!(r["eligible"], json!(true));
        assert_eq!(r["fields"][0]["status"], json!("EMPTY"));
        assert_eq!(r["fields"][0]["existing"], Value::Null);
    }
}
