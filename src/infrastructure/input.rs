use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::record::ReconciliationRecord;
use crate::domain::value_objects::{FieldTarget, Key};
use crate::infrastructure::config::InputConfig;

/// Streams reconciliation records out of a CSV file, one per data row.
///
/// Rows are mapped by position according to [`InputConfig`]; the header row
/// (when configured) is skipped. Rows are read lazily so each record is
/// processed before the next one is parsed.
pub struct CsvRecordSource<R: Read> {
    rows: csv::StringRecordsIntoIter<R>,
    layout: InputConfig,
    key_column: String,
}

impl CsvRecordSource<File> {
    pub fn open(path: &Path, layout: &InputConfig, key_column: &str) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file: {}", path.display()))?;
        Ok(Self::from_reader(file, layout, key_column))
    }
}

impl<R: Read> CsvRecordSource<R> {
    pub fn from_reader(reader: R, layout: &InputConfig, key_column: &str) -> Self {
        let rows = csv::ReaderBuilder::new()
            .has_headers(layout.has_header)
            .flexible(true)
            .from_reader(reader)
            .into_records();
        Self {
            rows,
            layout: layout.clone(),
            key_column: key_column.to_string(),
        }
    }

    fn to_record(&self, row: &csv::StringRecord) -> Result<ReconciliationRecord> {
        let line = row.position().map_or(0, |p| p.line());
        let width = self.layout.min_width();

        let key = Key::new(
            self.key_column.clone(),
            cell(row, self.layout.key_index, line, width)?,
        );
        let targets = self
            .layout
            .fields
            .iter()
            .map(|f| {
                Ok(FieldTarget::new(
                    f.column.clone(),
                    cell(row, f.index, line, width)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        ReconciliationRecord::new(key, targets).with_context(|| format!("line {}", line))
    }
}

fn cell(row: &csv::StringRecord, idx: usize, line: u64, width: usize) -> Result<&str> {
    row.get(idx).ok_or_else(|| {
        anyhow!(
            "line {}: expected at least {} columns, found {}",
            line,
            width,
            row.len()
        )
    })
}

impl<R: Read> Iterator for CsvRecordSource<R> {
    type Item = Result<ReconciliationRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(
            row.context("Failed to read input CSV")
                .and_then(|row| self.to_record(&row)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classification::KeyClassification;
    use crate::infrastructure::config::FieldColumn;

    const SAMPLE: &str = "\
DESC,QTY,INT_BIONUM,MANUPARTNUM,MFR,DATASHEET
Op amp,1,BIO-5,ABC123,TI,SHEET-1
Resistor,4,BIO-6,\"R,10K\",Yageo,
";

    fn records(csv: &str, layout: &InputConfig) -> Vec<Result<ReconciliationRecord>> {
        CsvRecordSource::from_reader(csv.as_bytes(), layout, "MANUPARTNUM").collect()
    }

    #[test]
    fn maps_default_layout_and_skips_header() {
        let recs = records(SAMPLE, &InputConfig::default());
        assert_eq!(recs.len(), 2);

        let first = recs[0].as_ref().unwrap();
        assert_eq!(first.key(), &Key::part_number("ABC123"));
        assert_eq!(first.key_status(), &KeyClassification::Unknown);
        let targets: Vec<_> = first
            .fields()
            .iter()
            .map(|f| (f.column.0.as_str(), f.target.as_str()))
            .collect();
        assert_eq!(targets, [("INT_BIONUM", "BIO-5"), ("DATASHEET", "SHEET-1")]);

        let second = recs[1].as_ref().unwrap();
        assert_eq!(second.key().value, "R,10K");
        assert_eq!(second.fields()[1].target, "");
    }

    #[test]
    fn short_row_reports_line_number() {
        let recs = records("H1,H2\nA,B,C\n", &InputConfig::default());
        let err = recs[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);
    }

    #[test]
    fn headerless_custom_layout() {
        let layout = InputConfig {
            has_header: false,
            key_index: 0,
            fields: vec![FieldColumn {
                column: "INT_BIONUM".into(),
                index: 1,
            }],
        };
        let recs = records("ABC123,BIO-5\n", &layout);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].as_ref().unwrap().fields()[0].target, "BIO-5");
    }

    #[test]
    fn open_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let source = CsvRecordSource::open(&path, &InputConfig::default(), "MANUPARTNUM").unwrap();
        assert_eq!(source.count(), 2);
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvRecordSource::open(
            &dir.path().join("absent.csv"),
            &InputConfig::default(),
            "MANUPARTNUM",
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("absent.csv"));
    }
}
