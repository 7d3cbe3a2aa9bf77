pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, Config, ConfigError, ConfigFormat};
pub use schema::{ConfigFile, RuleDefinition, RuleSetEntry, ValidationError, ValidationIssue};
