//! Per-file rule dispatch and rule-set runs.
//!
//! [`dispatch`] is pure: content and rules in, changes and new content out.
//! [`FileDispatcher`] adds loading, the folder walk, and persistence in
//! apply mode. Plan and apply compute exactly the same records; apply
//! additionally hands the new content to the persister.

use crate::document::Document;
use crate::engine::{structural, textual, RuleError};
use crate::record::{Change, ChangeRecord};
use crate::rule::{Rule, RuleSet, TargetError, TargetKind, TextRule};
use crate::store::{ContentLoader, ContentPersister, SaveOutcome, StoreError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Why processing of a single file stopped.
#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A rule that did not fit the document it was run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    pub index: usize,
    pub rule: String,
    pub reason: &'static str,
}

/// Result of running one rule set over one file's content.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub changes: Vec<Change>,
    pub skipped: Vec<SkippedRule>,
    /// New content, present only when at least one change was made.
    pub updated: Option<String>,
}

/// Apply `rules` in order to `content`.
///
/// Structural rules need a structured document; against text they are
/// skipped. Runs of consecutive text rules operate on the document's line
/// form, converting a structured document to canonical JSON and parsing it
/// back afterwards. If the edited text no longer parses, the document stays
/// textual and later structural rules are skipped.
pub fn dispatch(content: &str, rules: &[Rule]) -> Result<Dispatched, FileError> {
    let (mut document, layout) = Document::classify(content);
    let mut changes = Vec::new();
    let mut skipped = Vec::new();
    let mut index = 0;

    while index < rules.len() {
        match &rules[index] {
            Rule::Structural(rule) => {
                match &mut document {
                    Document::Structured(value) => {
                        changes.extend(structural::apply_rule(value, rule)?);
                    }
                    Document::Textual(_) => {
                        tracing::debug!(rule = %rules[index], "structural rule against text, skipping");
                        skipped.push(SkippedRule {
                            index,
                            rule: rules[index].to_string(),
                            reason: "jsonpath rule against a non-JSON document",
                        });
                    }
                }
                index += 1;
            }
            Rule::Text(_) => {
                let run: Vec<&TextRule> = rules[index..]
                    .iter()
                    .map_while(|rule| match rule {
                        Rule::Text(text) => Some(text),
                        Rule::Structural(_) => None,
                    })
                    .collect();
                index += run.len();

                let was_structured = document.is_structured();
                let lines = document.to_lines()?;
                let outcome = textual::apply_rules(lines, &run, document.as_structured())?;
                if outcome.changes.is_empty() {
                    continue;
                }
                changes.extend(outcome.changes);

                document = if was_structured {
                    let reparsed = Document::from_text(&outcome.lines.join("\n"));
                    if !reparsed.is_structured() {
                        tracing::debug!("text edits left the document unparseable; continuing as text");
                    }
                    reparsed
                } else {
                    Document::Textual(outcome.lines)
                };
            }
        }
    }

    let updated = if changes.is_empty() {
        None
    } else {
        Some(document.render(layout)?)
    };

    Ok(Dispatched {
        changes,
        skipped,
        updated,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Plan,
    Apply,
}

/// Everything that happened to one file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub records: Vec<ChangeRecord>,
    pub skipped: Vec<SkippedRule>,
    pub original: String,
    pub updated: Option<String>,
    /// Set in apply mode when new content was handed to the persister.
    pub saved: Option<SaveOutcome>,
}

#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: FileError,
}

/// Aggregated results of a run, filled in rule set by rule set.
#[derive(Debug, Default)]
pub struct RunReport {
    pub files: Vec<FileOutcome>,
    pub failures: Vec<FileFailure>,
    /// Files skipped because they are not UTF-8 text.
    pub binary: Vec<PathBuf>,
}

impl RunReport {
    pub fn records(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.files.iter().flat_map(|file| file.records.iter())
    }

    pub fn record_count(&self) -> usize {
        self.files.iter().map(|file| file.records.len()).sum()
    }

    pub fn changed_files(&self) -> usize {
        self.files.iter().filter(|file| !file.records.is_empty()).count()
    }

    pub fn skipped_rules(&self) -> usize {
        self.files.iter().map(|file| file.skipped.len()).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Move another report's entries to the end of this one.
    pub fn absorb(&mut self, other: RunReport) {
        self.files.extend(other.files);
        self.failures.extend(other.failures);
        self.binary.extend(other.binary);
    }
}

/// Runs rule sets against files through a content store.
pub struct FileDispatcher<S> {
    store: S,
    mode: Mode,
    exclude: Vec<PathBuf>,
}

impl<S: ContentLoader + ContentPersister> FileDispatcher<S> {
    pub fn new(store: S, mode: Mode) -> Self {
        Self {
            store,
            mode,
            exclude: Vec::new(),
        }
    }

    /// Never process `path` during folder walks (e.g. the report file).
    pub fn exclude(mut self, path: impl AsRef<Path>) -> Self {
        self.exclude.push(normalize(path.as_ref()));
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Load, dispatch, and in apply mode persist one file.
    ///
    /// Returns `Ok(None)` for files that are not UTF-8 text.
    pub fn process_file(&self, path: &Path, rules: &[Rule]) -> Result<Option<FileOutcome>, FileError> {
        let Some(original) = self.store.load(path)? else {
            return Ok(None);
        };

        let dispatched = dispatch(&original, rules)?;
        let saved = match (&dispatched.updated, self.mode) {
            (Some(content), Mode::Apply) => Some(self.store.save(path, content)?),
            _ => None,
        };

        let records = dispatched
            .changes
            .into_iter()
            .map(|change| ChangeRecord::new(path, change))
            .collect();

        Ok(Some(FileOutcome {
            path: path.to_path_buf(),
            records,
            skipped: dispatched.skipped,
            original,
            updated: dispatched.updated,
            saved,
        }))
    }

    /// Run one rule set against its target, recording per-file results and
    /// failures in `report`. Only an invalid target is returned as an error.
    pub fn run_rule_set(&self, set: &RuleSet, report: &mut RunReport) -> Result<TargetKind, TargetError> {
        let kind = set.target_kind()?;
        match kind {
            TargetKind::File => self.run_file(set.target(), &set.rules, report, true),
            TargetKind::Directory => {
                let walker = WalkDir::new(set.target())
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|entry| entry.file_name() != ".git");
                for entry in walker {
                    match entry {
                        Ok(entry) if entry.file_type().is_file() => {
                            if self.is_excluded(entry.path()) {
                                continue;
                            }
                            self.run_file(entry.path(), &set.rules, report, false);
                        }
                        Ok(_) => {}
                        Err(err) => {
                            let path = err
                                .path()
                                .map(Path::to_path_buf)
                                .unwrap_or_else(|| set.target().to_path_buf());
                            tracing::error!(path = %path.display(), error = %err, "walk failed");
                            report.failures.push(FileFailure {
                                path,
                                error: err.into(),
                            });
                        }
                    }
                }
            }
        }
        Ok(kind)
    }

    fn run_file(&self, path: &Path, rules: &[Rule], report: &mut RunReport, explicit: bool) {
        match self.process_file(path, rules) {
            Ok(Some(outcome)) => {
                for skip in &outcome.skipped {
                    // Folder walks routinely hit files a rule does not apply to
                    if explicit {
                        tracing::warn!(path = %path.display(), rule = %skip.rule, "{}", skip.reason);
                    } else {
                        tracing::debug!(path = %path.display(), rule = %skip.rule, "{}", skip.reason);
                    }
                }
                report.files.push(outcome);
            }
            Ok(None) => {
                tracing::debug!(path = %path.display(), "not UTF-8, skipping");
                report.binary.push(path.to_path_buf());
            }
            Err(error) => {
                tracing::error!(path = %path.display(), error = %error, "file failed");
                report.failures.push(FileFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        self.exclude.contains(&normalize(path))
    }
}

/// Canonical form for comparison; the file itself need not exist yet.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent
                .canonicalize()
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}
