use anyhow::Result;
use std::fmt::Write as FmtWrite;

use crate::domain::{ports::ReportWriter, record::ReconciliationRecord, summary::RunSummary};

pub const HEADER: &str = "KEY_STATUS,KEY,TABLE,FIELD_STATUS,FIELD,SRC,DST";

/// The line report: one key line per record followed by one line per field.
///
/// ```text
/// KEY_STATUS,KEY,TABLE,FIELD_STATUS,FIELD,SRC,DST
/// UNIQUE,ABC123,IC,
/// ,,,EMPTY,INT_BIONUM,"BIO-5","None"
/// ```
///
/// `SRC` is the value from the input, `DST` the value found in the database.
/// Absent values print as `None`. A key containing a comma, quote or line
/// break is quoted so the key line keeps its columns.
pub struct LinesWriter;

impl ReportWriter for LinesWriter {
    fn header(&mut self) -> Result<String> {
        Ok(format!("{}\n", HEADER))
    }

    fn record(&mut self, record: &ReconciliationRecord) -> Result<String> {
        let mut out = String::new();
        writeln!(
            out,
            "{},{},{},{}",
            record.key_status(),
            key_cell(&record.key().value),
            record.table().map_or("None", |t| t.0.as_str()),
            record.key_status().comment()
        )?;
        for field in record.fields() {
            let c = &field.classification;
            writeln!(
                out,
                ",,,{},{},\"{}\",\"{}\"",
                c.status,
                field.column,
                quoted(c.target.as_deref()),
                quoted(c.existing.as_deref())
            )?;
        }
        Ok(out)
    }

    fn footer(&mut self, _summary: &RunSummary) -> Result<String> {
        Ok(String::new())
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}

fn key_cell(key: &str) -> String {
    if key.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", key.replace('"', "\"\""))
    } else {
        key.to_string()
    }
}

fn quoted(v: Option<&str>) -> String {
    v.map_or_else(|| "None".to_string(), |s| s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::row_match::{RowMap, RowMatch};
    use crate::domain::value_objects::{FieldTarget, Key, TableName};
    use serde_json::{json, Value};

    fn record(datasheet: &str) -> ReconciliationRecord {
        ReconciliationRecord::new(
            Key::part_number("ABC123"),
            vec![
                FieldTarget::new("INT_BIONUM", "BIO-5"),
                FieldTarget::new("DATASHEET", datasheet),
            ],
        )
        .unwrap()
    }

    fn hit(table: &str, fields: &[(&str, Value)]) -> RowMatch {
        RowMatch {
            table: TableName(table.into()),
            key_value: json!("ABC123"),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<RowMap>(),
        }
    }

    fn render(rec: &ReconciliationRecord) -> String {
        LinesWriter.record(rec).unwrap()
    }

    #[test]
    fn missing_key() {
        let rec = record("SHEET-1").validated(&[]);
        assert_eq!(
            render(&rec),
            "MISSING,ABC123,None,\n\
             ,,,UNKNOWN,INT_BIONUM,\"None\",\"None\"\n\
             ,,,UNKNOWN,DATASHEET,\"None\",\"None\"\n"
        );
    }

    #[test]
    fn duplicate_key() {
        let rec = record("SHEET-1").validated(&[hit("RESISTOR", &[]), hit("CAPACITOR", &[])]);
        let text = render(&rec);
        assert_eq!(
            text.lines().next(),
            Some("DUPLICATES,ABC123,None,Tables: RESISTOR,CAPACITOR")
        );
    }

    #[test]
    fn unique_key_with_mismatch() {
        let rec = record("SHEET-2").validated(&[hit(
            "IC",
            &[("INT_BIONUM", Value::Null), ("DATASHEET", json!("SHEET-1"))],
        )]);
        assert_eq!(
            render(&rec),
            "UNIQUE,ABC123,IC,\n\
             ,,,EMPTY,INT_BIONUM,\"BIO-5\",\"None\"\n\
             ,,,MISMATCH,DATASHEET,\"SHEET-2\",\"SHEET-1\"\n"
        );
    }

    #[test]
    fn quotes_inside_values_are_doubled() {
        let rec = record("6\" reel").validated(&[hit(
            "IC",
            &[("INT_BIONUM", Value::Null), ("DATASHEET", Value::Null)],
        )]);
        assert!(render(&rec).contains(",,,EMPTY,DATASHEET,\"6\"\" reel\",\"None\""));
    }

    #[test]
    fn key_with_comma_is_quoted() {
        let rec = ReconciliationRecord::new(
            Key::part_number("R,10K"),
            vec![FieldTarget::new("INT_BIONUM", "BIO-6")],
        )
        .unwrap()
        .validated(&[]);
        assert_eq!(
            render(&rec).lines().next(),
            Some("MISSING,\"R,10K\",None,")
        );
        assert_eq!(key_cell("ABC123"), "ABC123");
        assert_eq!(key_cell("6\" reel"), "\"6\"\" reel\"");
    }

    #[test]
    fn header_line() {
        assert_eq!(LinesWriter.header().unwrap(), format!("{HEADER}\n"));
    }
}
