//! Report files: txt, CSV or a JSON array of change records.
//!
//! A run writes its report incrementally, one batch per rule set. The first
//! batch truncates the file; later batches append to it.

use crate::document::canonical_json;
use crate::record::{Change, ChangeKind, ChangeRecord};
use crate::resolve::as_text;
use serde_json::Value;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("unknown report format '{0}' (expected txt, csv or json)")]
    UnknownFormat(String),

    #[error("failed to write report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write CSV report: {0}")]
    Csv(#[from] csv::Error),

    #[error("report {} is not a JSON array: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Txt,
    Csv,
    Json,
}

impl ReportFormat {
    /// Format implied by the file extension; anything unrecognised is txt.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => ReportFormat::Csv,
            Some("json") => ReportFormat::Json,
            _ => ReportFormat::Txt,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Txt => "txt",
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(ReportFormat::Txt),
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            _ => Err(ReportError::UnknownFormat(s.to_string())),
        }
    }
}

/// Appends batches of records to one report file.
#[derive(Debug)]
pub struct ReportWriter {
    path: PathBuf,
    format: ReportFormat,
    started: bool,
    /// Shape of the last CSV row written; a header precedes every change.
    last_kind: Option<ChangeKind>,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>, format: ReportFormat) -> Self {
        Self {
            path: path.into(),
            format,
            started: false,
            last_kind: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn write_batch(&mut self, records: &[ChangeRecord]) -> Result<(), ReportError> {
        match self.format {
            ReportFormat::Txt => self.write_txt(records)?,
            ReportFormat::Csv => self.write_csv(records)?,
            ReportFormat::Json => self.write_json(records)?,
        }
        self.started = true;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> ReportError {
        ReportError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn open(&self) -> Result<File, ReportError> {
        let mut options = OpenOptions::new();
        if self.started {
            options.append(true).create(true);
        } else {
            options.write(true).create(true).truncate(true);
        }
        options.open(&self.path).map_err(|e| self.io_error(e))
    }

    fn write_txt(&self, records: &[ChangeRecord]) -> Result<(), ReportError> {
        let mut out = BufWriter::new(self.open()?);
        for record in records {
            write_txt_block(&mut out, record).map_err(|e| self.io_error(e))?;
        }
        out.flush().map_err(|e| self.io_error(e))
    }

    fn write_csv(&mut self, records: &[ChangeRecord]) -> Result<(), ReportError> {
        let file = self.open()?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        for record in records {
            let kind = record.kind();
            if self.last_kind != Some(kind) {
                writer.write_record(csv_header(kind))?;
                self.last_kind = Some(kind);
            }
            writer.write_record(csv_row(record))?;
        }
        writer.flush().map_err(|e| self.io_error(e))
    }

    fn write_json(&self, records: &[ChangeRecord]) -> Result<(), ReportError> {
        let mut entries: Vec<Value> = if self.started {
            let existing = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
            serde_json::from_str(&existing).map_err(|source| ReportError::Json {
                path: self.path.clone(),
                source,
            })?
        } else {
            Vec::new()
        };

        let json_error = |source| ReportError::Json {
            path: self.path.clone(),
            source,
        };
        for record in records {
            entries.push(serde_json::to_value(record).map_err(json_error)?);
        }
        let mut text = canonical_json(&Value::Array(entries)).map_err(json_error)?;
        text.push('\n');
        std::fs::write(&self.path, text).map_err(|e| self.io_error(e))
    }
}

fn write_txt_block(out: &mut impl Write, record: &ChangeRecord) -> std::io::Result<()> {
    writeln!(out, "File: {}", record.file().display())?;
    match &record.change {
        Change::TextReplace {
            line_number,
            old_line,
            new_line,
            search_text,
            replace_text,
            occurrences,
        } => {
            writeln!(out, "  Line Number: {line_number}")?;
            writeln!(out, "  Old Line: {old_line}")?;
            writeln!(out, "  New Line: {new_line}")?;
            writeln!(out, "  Search Text: {search_text}")?;
            writeln!(out, "  Replace Text: {replace_text}")?;
            writeln!(out, "  Occurrences: {occurrences}")?;
        }
        Change::JsonReplace {
            json_path,
            old_value,
            new_value,
        } => {
            writeln!(out, "  JSON Path: {json_path}")?;
            writeln!(out, "  Old Value: {}", as_text(old_value))?;
            writeln!(out, "  New Value: {}", as_text(new_value))?;
        }
        Change::LineInsert {
            line_number,
            insert_position,
            lines_inserted,
        } => {
            writeln!(
                out,
                "  {} line(s) inserted {} line {}",
                lines_inserted.len(),
                insert_position,
                line_number
            )?;
            for line in lines_inserted {
                writeln!(out, "    + {line}")?;
            }
        }
    }
    writeln!(out)
}

fn csv_header(kind: ChangeKind) -> &'static [&'static str] {
    match kind {
        ChangeKind::TextReplace => &[
            "file",
            "line_number",
            "old_line",
            "new_line",
            "search_text",
            "replace_text",
            "occurrences",
        ],
        ChangeKind::JsonReplace => &["file", "json_path", "old_value", "new_value"],
        ChangeKind::LineInsert => &["file", "line_number", "insert_position", "lines_inserted"],
    }
}

fn csv_row(record: &ChangeRecord) -> Vec<String> {
    let file = record.file().display().to_string();
    match &record.change {
        Change::TextReplace {
            line_number,
            old_line,
            new_line,
            search_text,
            replace_text,
            occurrences,
        } => vec![
            file,
            line_number.to_string(),
            old_line.clone(),
            new_line.clone(),
            search_text.clone(),
            replace_text.clone(),
            occurrences.to_string(),
        ],
        Change::JsonReplace {
            json_path,
            old_value,
            new_value,
        } => vec![file, json_path.clone(), as_text(old_value), as_text(new_value)],
        Change::LineInsert {
            line_number,
            insert_position,
            lines_inserted,
        } => vec![
            file,
            line_number.to_string(),
            insert_position.to_string(),
            lines_inserted.join("\n"),
        ],
    }
}
