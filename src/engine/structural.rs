//! Path-addressed replacement over structured documents.

use crate::engine::RuleError;
use crate::jsonpath::{Location, Step};
use crate::record::Change;
use crate::rule::StructuralRule;
use serde_json::Value;

/// Apply `rules` in order. Each rule re-evaluates its path against the
/// document as left by the previous rules.
pub fn apply_rules(document: &mut Value, rules: &[&StructuralRule]) -> Result<Vec<Change>, RuleError> {
    let mut changes = Vec::new();
    for rule in rules {
        changes.extend(apply_rule(document, rule)?);
    }
    Ok(changes)
}

/// Apply one rule to every location its path matches.
///
/// Matches whose resolved value equals the current value are left alone and
/// produce no change.
pub fn apply_rule(document: &mut Value, rule: &StructuralRule) -> Result<Vec<Change>, RuleError> {
    let locations = rule.path.locate(document);
    let mut changes = Vec::new();

    for location in locations {
        // An earlier match in this rule may have replaced an ancestor.
        let Some(old_value) = location.resolve(document).cloned() else {
            tracing::debug!(path = %rule.path, location = %location, "match no longer present");
            continue;
        };

        let new_value = rule.value.resolve(&old_value, Some(&*document))?;
        if new_value == old_value {
            continue;
        }

        assign(document, &location, new_value.clone())?;
        tracing::debug!(location = %location, "replaced value");
        changes.push(Change::JsonReplace {
            json_path: location.to_string(),
            old_value,
            new_value,
        });
    }

    Ok(changes)
}

/// Write `value` into the parent container of `location`.
fn assign(document: &mut Value, location: &Location, value: Value) -> Result<(), RuleError> {
    let (Some(parent_location), Some(step)) = (location.parent(), location.last()) else {
        return Err(RuleError::UnsupportedContainer {
            location: location.to_string(),
            kind: "the document root",
        });
    };
    let parent = parent_location
        .resolve_mut(document)
        .ok_or_else(|| RuleError::UnsupportedContainer {
            location: location.to_string(),
            kind: "absent",
        })?;

    match (parent, step) {
        (Value::Object(map), Step::Key(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Value::Array(items), Step::Index(index)) if *index < items.len() => {
            items[*index] = value;
            Ok(())
        }
        (other, _) => Err(RuleError::UnsupportedContainer {
            location: location.to_string(),
            kind: kind_name(other),
        }),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
