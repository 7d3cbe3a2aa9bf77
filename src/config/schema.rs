use crate::engine::RuleError;
use crate::jsonpath::JsonPath;
use crate::record::InsertPosition;
use crate::resolve::ValueSource;
use crate::rule::{InsertRule, Rule, RuleSet, SearchRule, StructuralRule, TextRule};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Root of a configuration file: a bare list of entries, or a table with a
/// `rule_sets` list (the only shape TOML can express).
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum ConfigFile {
    List(Vec<RuleSetEntry>),
    Table {
        #[serde(default)]
        rule_sets: Vec<RuleSetEntry>,
    },
}

impl ConfigFile {
    pub fn entries(&self) -> &[RuleSetEntry] {
        match self {
            ConfigFile::List(entries) => entries,
            ConfigFile::Table { rule_sets } => rule_sets,
        }
    }

    /// Check every entry and compile the valid ones. All problems are
    /// collected before failing.
    pub fn compile(&self) -> Result<Vec<RuleSet>, ValidationError> {
        let mut issues = Vec::new();
        let mut rule_sets = Vec::new();

        if self.entries().is_empty() {
            issues.push(ValidationIssue::EmptyRuleSetList);
        }

        for (index, entry) in self.entries().iter().enumerate() {
            let label = entry.label(index);
            if entry.path.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry: label.clone(),
                    field: "path",
                });
            }

            let definitions: Vec<&RuleDefinition> = match (entry.rules.is_empty(), entry.inline.is_empty()) {
                (true, true) => {
                    issues.push(ValidationIssue::MissingField {
                        entry: label.clone(),
                        field: "rules",
                    });
                    continue;
                }
                (false, false) => {
                    issues.push(ValidationIssue::InvalidCombo {
                        entry: label.clone(),
                        message: "inline rule fields cannot be combined with 'rules'".to_string(),
                    });
                    continue;
                }
                (true, false) => vec![&entry.inline],
                (false, true) => entry.rules.iter().collect(),
            };

            let mut rules = Vec::with_capacity(definitions.len());
            for (rule_index, definition) in definitions.into_iter().enumerate() {
                match definition.compile() {
                    Ok(rule) => rules.push(rule),
                    Err(source) => issues.push(ValidationIssue::InvalidRule {
                        entry: label.clone(),
                        rule: definition.label(rule_index),
                        source,
                    }),
                }
            }

            rule_sets.push(RuleSet {
                id: entry.id.clone(),
                target: PathBuf::from(entry.path.trim()),
                rules,
            });
        }

        if issues.is_empty() {
            Ok(rule_sets)
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// One target path with the rules to run against it.
///
/// Either `rules` lists the rules, or a single rule's fields sit directly on
/// the entry.
#[derive(Debug, Deserialize, Clone)]
pub struct RuleSetEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
    #[serde(flatten)]
    pub inline: RuleDefinition,
}

impl RuleSetEntry {
    fn label(&self, index: usize) -> String {
        match (&self.id, self.path.trim()) {
            (Some(id), _) => id.clone(),
            (None, "") => format!("#{}", index + 1),
            (None, path) => path.to_string(),
        }
    }
}

/// A rule as written in the configuration, before validation.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RuleDefinition {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub jsonpath: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub line_number: Option<usize>,
    #[serde(default, alias = "replace", deserialize_with = "present")]
    pub replacement: Option<Value>,
    #[serde(default, alias = "transform_format")]
    pub transform: Option<String>,
    #[serde(default)]
    pub insert_position: Option<String>,
    #[serde(default, alias = "lines_to_insert")]
    pub lines: Option<Vec<String>>,
}

/// Keeps an explicit `null` replacement distinct from an absent one.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl RuleDefinition {
    pub fn is_empty(&self) -> bool {
        self.jsonpath.is_none()
            && self.search.is_none()
            && self.line_number.is_none()
            && self.replacement.is_none()
            && self.transform.is_none()
            && self.insert_position.is_none()
            && self.lines.is_none()
    }

    fn label(&self, index: usize) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("#{}", index + 1),
        }
    }

    /// Build the typed rule. Exactly one addressing field must be set, and
    /// only the fields that belong to it.
    pub fn compile(&self) -> Result<Rule, RuleError> {
        let addressing = [
            self.jsonpath.is_some(),
            self.search.is_some(),
            self.line_number.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        match addressing {
            0 => {
                return Err(RuleError::format(
                    "rule must specify one of 'jsonpath', 'search' or 'line_number'",
                ))
            }
            1 => {}
            _ => {
                return Err(RuleError::format(
                    "'jsonpath', 'search' and 'line_number' are mutually exclusive",
                ))
            }
        }

        if let Some(line_number) = self.line_number {
            return self.compile_insert(line_number).map(|rule| Rule::Text(TextRule::Insert(rule)));
        }

        if self.insert_position.is_some() || self.lines.is_some() {
            return Err(RuleError::format(
                "'insert_position' and 'lines' only apply to 'line_number' rules",
            ));
        }
        let value = ValueSource::from_parts(self.replacement.clone(), self.transform.as_deref())?;

        if let Some(expr) = &self.jsonpath {
            let path = JsonPath::parse(expr).map_err(|e| RuleError::format(e.to_string()))?;
            return Ok(Rule::Structural(StructuralRule {
                id: self.id.clone(),
                path,
                value,
            }));
        }

        let search = self.search.clone().unwrap_or_default();
        if search.is_empty() {
            return Err(RuleError::format("'search' must not be empty"));
        }
        Ok(Rule::Text(TextRule::Search(SearchRule {
            id: self.id.clone(),
            search,
            value,
        })))
    }

    fn compile_insert(&self, line_number: usize) -> Result<InsertRule, RuleError> {
        if self.replacement.is_some() || self.transform.is_some() {
            return Err(RuleError::format(
                "'line_number' rules insert 'lines'; 'replacement' and 'transform' do not apply",
            ));
        }
        if line_number == 0 {
            return Err(RuleError::format("'line_number' is 1-based"));
        }
        let position: InsertPosition = self
            .insert_position
            .as_deref()
            .ok_or_else(|| RuleError::format("'line_number' rules require 'insert_position'"))?
            .parse()?;
        let lines = self
            .lines
            .clone()
            .ok_or_else(|| RuleError::format("'line_number' rules require 'lines'"))?;

        Ok(InsertRule {
            id: self.id.clone(),
            line_number,
            position,
            lines,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRuleSetList,
    MissingField {
        entry: String,
        field: &'static str,
    },
    InvalidCombo {
        entry: String,
        message: String,
    },
    InvalidRule {
        entry: String,
        rule: String,
        source: RuleError,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleSetList => write!(f, "config contains no rule sets"),
            ValidationIssue::MissingField { entry, field } => {
                write!(f, "entry '{entry}' missing required field '{field}'")
            }
            ValidationIssue::InvalidCombo { entry, message } => {
                write!(f, "entry '{entry}' has invalid configuration: {message}")
            }
            ValidationIssue::InvalidRule {
                entry,
                rule,
                source,
            } => write!(f, "entry '{entry}' rule {rule}: {source}"),
        }
    }
}
