//! Change records: one per realized or planned edit.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Before,
    After,
}

impl InsertPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            InsertPosition::Before => "before",
            InsertPosition::After => "after",
        }
    }
}

impl fmt::Display for InsertPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an engine produced for one match. Engines know nothing about files.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    TextReplace {
        line_number: usize,
        old_line: String,
        new_line: String,
        search_text: String,
        replace_text: String,
        occurrences: usize,
    },
    JsonReplace {
        json_path: String,
        old_value: Value,
        new_value: Value,
    },
    LineInsert {
        line_number: usize,
        insert_position: InsertPosition,
        lines_inserted: Vec<String>,
    },
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::TextReplace { .. } => ChangeKind::TextReplace,
            Change::JsonReplace { .. } => ChangeKind::JsonReplace,
            Change::LineInsert { .. } => ChangeKind::LineInsert,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    TextReplace,
    JsonReplace,
    LineInsert,
}

/// A change attributed to the file it was made in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub file: PathBuf,
    #[serde(flatten)]
    pub change: Change,
}

impl ChangeRecord {
    pub fn new(file: impl Into<PathBuf>, change: Change) -> Self {
        Self {
            file: file.into(),
            change,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn kind(&self) -> ChangeKind {
        self.change.kind()
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.change {
            Change::TextReplace {
                line_number,
                search_text,
                replace_text,
                occurrences,
                ..
            } => write!(
                f,
                "{}:{}: '{}' -> '{}' ({} occurrence{})",
                self.file.display(),
                line_number,
                search_text,
                replace_text,
                occurrences,
                if *occurrences == 1 { "" } else { "s" }
            ),
            Change::JsonReplace {
                json_path,
                old_value,
                new_value,
            } => write!(
                f,
                "{} {}: {} -> {}",
                self.file.display(),
                json_path,
                old_value,
                new_value
            ),
            Change::LineInsert {
                line_number,
                insert_position,
                lines_inserted,
            } => write!(
                f,
                "{}: {} line(s) inserted {} line {}",
                self.file.display(),
                lines_inserted.len(),
                insert_position,
                line_number
            ),
        }
    }
}
