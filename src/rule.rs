//! Compiled rules and rule sets.
//!
//! These are produced by the configuration loader after validation; every
//! `Rule` is well-formed by construction.

use crate::engine::RuleError;
use crate::jsonpath::JsonPath;
use crate::record::InsertPosition;
use crate::resolve::ValueSource;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum Rule {
    Structural(StructuralRule),
    Text(TextRule),
}

impl Rule {
    pub fn id(&self) -> Option<&str> {
        match self {
            Rule::Structural(rule) => rule.id.as_deref(),
            Rule::Text(TextRule::Search(rule)) => rule.id.as_deref(),
            Rule::Text(TextRule::Insert(rule)) => rule.id.as_deref(),
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Rule::Structural(_))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = self.id() {
            write!(f, "'{id}' ")?;
        }
        match self {
            Rule::Structural(rule) => write!(f, "(jsonpath {})", rule.path),
            Rule::Text(TextRule::Search(rule)) => write!(f, "(search {:?})", rule.search),
            Rule::Text(TextRule::Insert(rule)) => write!(
                f,
                "(insert {} line {})",
                rule.position, rule.line_number
            ),
        }
    }
}

/// Path-addressed value replacement.
#[derive(Debug, Clone)]
pub struct StructuralRule {
    pub id: Option<String>,
    pub path: JsonPath,
    pub value: ValueSource,
}

/// Rules applied to the line representation of a document.
#[derive(Debug, Clone)]
pub enum TextRule {
    Search(SearchRule),
    Insert(InsertRule),
}

#[derive(Debug, Clone)]
pub struct SearchRule {
    pub id: Option<String>,
    pub search: String,
    pub value: ValueSource,
}

#[derive(Debug, Clone)]
pub struct InsertRule {
    pub id: Option<String>,
    /// 1-based, interpreted against the document as it is when the rule runs.
    pub line_number: usize,
    pub position: InsertPosition,
    pub lines: Vec<String>,
}

impl FromStr for InsertPosition {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(InsertPosition::Before),
            "after" => Ok(InsertPosition::After),
            other => Err(RuleError::format(format!(
                "insert_position must be 'before' or 'after', got '{other}'"
            ))),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("path '{}' does not exist", .0.display())]
    Missing(PathBuf),

    #[error("path '{}' is neither a file nor a directory", .0.display())]
    Unsupported(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    File,
    Directory,
}

/// An ordered list of rules bound to one file or directory.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub id: Option<String>,
    pub target: PathBuf,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(target: impl Into<PathBuf>, rules: Vec<Rule>) -> Self {
        Self {
            id: None,
            target: target.into(),
            rules,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Check the target before any file is touched.
    pub fn target_kind(&self) -> Result<TargetKind, TargetError> {
        if !self.target.exists() {
            return Err(TargetError::Missing(self.target.clone()));
        }
        if self.target.is_file() {
            Ok(TargetKind::File)
        } else if self.target.is_dir() {
            Ok(TargetKind::Directory)
        } else {
            Err(TargetError::Unsupported(self.target.clone()))
        }
    }
}
