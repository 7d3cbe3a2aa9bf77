//! Line-oriented search/replace and line insertion.

use crate::engine::RuleError;
use crate::record::{Change, InsertPosition};
use crate::resolve::as_text;
use crate::rule::{InsertRule, SearchRule, TextRule};
use serde_json::Value;

/// Rewritten lines plus the changes that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOutcome {
    pub lines: Vec<String>,
    pub changes: Vec<Change>,
}

/// Apply `rules` in order to `lines`.
///
/// Consecutive search rules run as one pass: every line sees every rule in
/// rule order before the next line is visited. An insertion rule ends the
/// pass, and its line number is read against the lines as they are when it
/// runs; lines inserted by earlier rules are not compensated for.
///
/// `document` is the structured form of the file, if it has one; transforms
/// with path placeholders need it.
pub fn apply_rules(
    lines: Vec<String>,
    rules: &[&TextRule],
    document: Option<&Value>,
) -> Result<TextOutcome, RuleError> {
    let mut lines = lines;
    let mut changes = Vec::new();
    let mut shifted = false;
    let mut pending: Vec<&SearchRule> = Vec::new();

    for rule in rules {
        match rule {
            TextRule::Search(search) => pending.push(search),
            TextRule::Insert(insert) => {
                if !pending.is_empty() {
                    changes.extend(replace_in_lines(&mut lines, &pending, document)?);
                    pending.clear();
                }
                if shifted {
                    tracing::warn!(
                        line_number = insert.line_number,
                        "line-number rule follows an insertion; its line number refers to the shifted lines"
                    );
                }
                if let Some(change) = insert_lines(&mut lines, insert)? {
                    shifted = true;
                    changes.push(change);
                }
            }
        }
    }
    if !pending.is_empty() {
        changes.extend(replace_in_lines(&mut lines, &pending, document)?);
    }

    Ok(TextOutcome { lines, changes })
}

/// Line-major search/replace: one change per (line, rule) pair that matched.
pub fn replace_in_lines(
    lines: &mut [String],
    rules: &[&SearchRule],
    document: Option<&Value>,
) -> Result<Vec<Change>, RuleError> {
    // Replacement text does not depend on the line; resolve it on first use.
    let mut replacements: Vec<Option<String>> = vec![None; rules.len()];
    let mut changes = Vec::new();

    for (index, line) in lines.iter_mut().enumerate() {
        for (slot, rule) in rules.iter().enumerate() {
            if rule.search.is_empty() {
                return Err(RuleError::format("search text must not be empty"));
            }
            let occurrences = line.matches(rule.search.as_str()).count();
            if occurrences == 0 {
                continue;
            }

            let replace_text = match &replacements[slot] {
                Some(text) => text.clone(),
                None => {
                    let original = Value::String(rule.search.clone());
                    let text = as_text(&rule.value.resolve(&original, document)?);
                    replacements[slot] = Some(text.clone());
                    text
                }
            };

            let new_line = line.replace(rule.search.as_str(), &replace_text);
            let old_line = std::mem::replace(line, new_line.clone());
            changes.push(Change::TextReplace {
                line_number: index + 1,
                old_line,
                new_line,
                search_text: rule.search.clone(),
                replace_text,
                occurrences,
            });
        }
    }

    Ok(changes)
}

/// Insert the rule's block before or after its 1-based target line.
///
/// Valid targets are `1..=len + 1`; `len + 1` appends. An empty block is
/// accepted and produces no change.
pub fn insert_lines(lines: &mut Vec<String>, rule: &InsertRule) -> Result<Option<Change>, RuleError> {
    let len = lines.len();
    if rule.line_number == 0 || rule.line_number > len + 1 {
        return Err(RuleError::format(format!(
            "line_number {} is outside 1..={}",
            rule.line_number,
            len + 1
        )));
    }
    if rule.lines.is_empty() {
        return Ok(None);
    }

    let at = match rule.position {
        InsertPosition::Before => rule.line_number - 1,
        InsertPosition::After => rule.line_number.min(len),
    };
    lines.splice(at..at, rule.lines.iter().cloned());

    Ok(Some(Change::LineInsert {
        line_number: rule.line_number,
        insert_position: rule.position,
        lines_inserted: rule.lines.clone(),
    }))
}
