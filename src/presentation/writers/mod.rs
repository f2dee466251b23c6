use crate::domain::{ports::ReportWriter, record::ReconciliationRecord, summary::RunSummary};
use crate::infrastructure::config::DbConfig;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use self::{json::JsonWriter, lines::LinesWriter, sql::SqlWriter};

pub mod json;
pub mod lines;
pub mod sql;

/// Register available writers - OCP: add new ones without touching main.rs
pub fn all_writers(db: &DbConfig) -> Vec<Box<dyn ReportWriter>> {
    vec![
        Box::new(LinesWriter),
        Box::new(JsonWriter::default()),
        Box::new(SqlWriter::new(db)),
    ]
}

pub fn writer_for(format: &str, db: &DbConfig) -> Option<Box<dyn ReportWriter>> {
    match format {
        "lines" | "csv" => Some(Box::new(LinesWriter)),
        "json" => Some(Box::new(JsonWriter::default())),
        "sql" => Some(Box::new(SqlWriter::new(db))),
        _ => None,
    }
}

/// A writer bound to where its text goes.
pub struct ReportOutput {
    writer: Box<dyn ReportWriter>,
    sink: Box<dyn Write + Send>,
    path: Option<PathBuf>,
}

impl ReportOutput {
    pub fn new(writer: Box<dyn ReportWriter>, sink: Box<dyn Write + Send>) -> Self {
        Self {
            writer,
            sink,
            path: None,
        }
    }

    pub fn stdout(writer: Box<dyn ReportWriter>) -> Self {
        Self::new(writer, Box::new(io::stdout()))
    }

    /// Write to `<dir>/<stem>.<extension>`, creating `dir` if needed.
    pub fn file(writer: Box<dyn ReportWriter>, dir: &Path, stem: &str) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        let path = dir.join(format!("{}.{}", stem, writer.extension()));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        Ok(Self {
            writer,
            sink: Box::new(BufWriter::new(file)),
            path: Some(path),
        })
    }

    /// File this output writes to, `None` for streams.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn begin(&mut self) -> Result<()> {
        let text = self.writer.header()?;
        self.write(&text)
    }

    pub fn emit(&mut self, record: &ReconciliationRecord) -> Result<()> {
        let text = self.writer.record(record)?;
        self.write(&text)
    }

    pub fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        let text = self.writer.footer(summary)?;
        self.write(&text)?;
        self.sink.flush().context("Failed to flush report")
    }

    fn write(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.sink
            .write_all(text.as_bytes())
            .context("Failed to write report")?;
        // Line reports are read as they are produced, so push each chunk out.
        self.sink.flush().context("Failed to flush report")
    }
}
