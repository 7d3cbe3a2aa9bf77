//! Integration tests: rule sets run through `FileDispatcher` against real
//! directories, with reports written alongside.

mod folder_runs;
mod mixed_documents;
mod report_output;

use source_modifier::config::{load_from_str, ConfigFormat};
use source_modifier::rule::RuleSet;
use std::path::Path;

/// Compile a JSON config whose `path` values are relative to `root`.
pub fn rule_sets(root: &Path, config: serde_json::Value) -> Vec<RuleSet> {
    let mut config = config;
    if let Some(entries) = config.as_array_mut() {
        for entry in entries {
            if let Some(path) = entry.get("path").and_then(|p| p.as_str()) {
                let absolute = root.join(path).display().to_string();
                entry["path"] = serde_json::Value::String(absolute);
            }
        }
    }
    load_from_str(&config.to_string(), ConfigFormat::Json)
        .unwrap()
        .rule_sets
}
