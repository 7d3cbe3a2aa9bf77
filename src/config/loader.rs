use crate::config::schema::{ConfigFile, ValidationError};
use crate::rule::RuleSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Validated rule sets, in configuration order.
#[derive(Debug, Clone)]
pub struct Config {
    pub rule_sets: Vec<RuleSet>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Json { path: None, source } => ConfigError::Json {
                path: Some(path),
                source,
            },
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Json { path, source } => match path {
                Some(path) => write!(f, "failed to parse config JSON ({}): {}", path.display(), source),
                None => write!(f, "failed to parse config JSON: {}", source),
            },
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(f, "failed to parse config TOML ({}): {}", path.display(), source),
                None => write!(f, "failed to parse config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid config ({}):\n{}", path.display(), source),
                None => write!(f, "invalid config:\n{}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let file: ConfigFile = match format {
        ConfigFormat::Json => serde_json::from_str(input)
            .map_err(|source| ConfigError::Json { path: None, source })?,
        ConfigFormat::Toml => toml_edit::de::from_str(input)
            .map_err(|source| ConfigError::Toml { path: None, source })?,
    };
    let rule_sets = file
        .compile()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(Config { rule_sets })
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents, ConfigFormat::from_path(path)).map_err(|error| error.with_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Rule, TextRule};

    #[test]
    fn loads_toml_rule_sets() {
        let input = r#"
[[rule_sets]]
id = "names"
path = "conf/app.json"

[[rule_sets.rules]]
jsonpath = "$.user.name"
replacement = "bob"

[[rule_sets.rules]]
jsonpath = "$.user.port"
replacement = 8080

[[rule_sets]]
path = "src"
search = "foo"
replace = "bar"
"#;
        let config = load_from_str(input, ConfigFormat::Toml).unwrap();
        assert_eq!(config.rule_sets.len(), 2);
        assert_eq!(config.rule_sets[0].rules.len(), 2);
        assert!(matches!(
            config.rule_sets[1].rules[0],
            Rule::Text(TextRule::Search(_))
        ));
    }

    #[test]
    fn json_syntax_error() {
        let err = load_from_str("[{", ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Json { path: None, .. }));
    }

    #[test]
    fn errors_carry_the_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"path": "x", "search": "a"}]"#).unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { path: Some(_), .. }));
        assert!(err.to_string().contains("rules.json"));
    }

    #[test]
    fn missing_file_is_io() {
        let err = load_from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("r.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("r.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("rules")), ConfigFormat::Json);
    }
}
