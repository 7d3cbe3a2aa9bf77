//! Source Modifier: rule-driven batch editing of text and JSON files
//!
//! Rule sets bind an ordered list of rules to a file or directory. Each file
//! is classified once as structured (a JSON object or array) or textual, and
//! every rule is routed to the engine for its shape:
//!
//! - JSONPath rules replace values in structured documents
//! - search rules replace every occurrence of a literal, line by line
//! - line-number rules insert a block of lines before or after a line
//!
//! Every edit produces a [`ChangeRecord`]. Plan mode and apply mode compute
//! identical records; only apply mode writes files.
//!
//! # Safety
//!
//! - Transforms are a closed template language: `{original}` and
//!   `{path:<expr>}` placeholders, nothing else
//! - Atomic file writes (tempfile + fsync + rename)
//! - A file is written only after its whole rule set succeeded
//! - Repeated runs of literal JSONPath rules report nothing
//!
//! # Example
//!
//! ```
//! use source_modifier::config::{load_from_str, ConfigFormat};
//! use source_modifier::dispatch::dispatch;
//!
//! let config = load_from_str(
//!     r#"[{"path": "app.json", "jsonpath": "$.user.name", "replacement": "bob"}]"#,
//!     ConfigFormat::Json,
//! )
//! .unwrap();
//!
//! let result = dispatch(r#"{"user": {"name": "alice"}}"#, &config.rule_sets[0].rules).unwrap();
//! assert_eq!(result.changes.len(), 1);
//! assert!(result.updated.unwrap().contains("\"bob\""));
//! ```

pub mod config;
pub mod dispatch;
pub mod document;
pub mod engine;
pub mod jsonpath;
pub mod record;
pub mod report;
pub mod resolve;
pub mod rule;
pub mod store;

pub use config::{load_from_path, load_from_str, Config, ConfigError};
pub use dispatch::{dispatch, FileDispatcher, Mode, RunReport};
pub use document::Document;
pub use engine::RuleError;
pub use jsonpath::{JsonPath, JsonPathError, Location};
pub use record::{Change, ChangeKind, ChangeRecord, InsertPosition};
pub use resolve::{Template, ValueSource};
pub use rule::{Rule, RuleSet, TargetError, TargetKind};
pub use store::{ContentLoader, ContentPersister, FsStore, SaveOutcome, StoreError};
