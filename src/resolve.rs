//! Replacement value resolution.
//!
//! A rule produces its new value either from a literal or from a transform
//! template. Templates are a closed vocabulary:
//!
//! - `{original}` - the matched old value
//! - `{path:<expr>}` / `{jsonpath:<expr>}` - first match of `<expr>` against the
//!   whole document, or an empty string when nothing matches
//! - `{{` / `}}` - literal braces
//!
//! Nothing else can be referenced; a template naming any other binding is
//! rejected when it is parsed.

use crate::engine::RuleError;
use crate::jsonpath::JsonPath;
use serde_json::Value;
use std::collections::HashMap;

/// The only implicit binding available to templates.
pub const ORIGINAL: &str = "original";

const PATH_PREFIXES: [&str; 2] = ["path:", "jsonpath:"];

static EMPTY: Value = Value::String(String::new());

/// How a rule computes its new value.
#[derive(Debug, Clone)]
pub enum ValueSource {
    Literal(Value),
    Transform(Template),
}

impl ValueSource {
    /// Build from the two optional rule fields; exactly one must be present.
    pub fn from_parts(replacement: Option<Value>, transform: Option<&str>) -> Result<Self, RuleError> {
        match (replacement, transform) {
            (Some(value), None) => Ok(ValueSource::Literal(value)),
            (None, Some(template)) => Ok(ValueSource::Transform(Template::parse(template)?)),
            (Some(_), Some(_)) => Err(RuleError::format(
                "'replacement' and 'transform' are mutually exclusive",
            )),
            (None, None) => Err(RuleError::format(
                "rule must specify either 'replacement' or 'transform'",
            )),
        }
    }

    /// Resolve the new value for one match.
    ///
    /// `document` is the full structured document when there is one; path
    /// placeholders fail without it.
    pub fn resolve(&self, original: &Value, document: Option<&Value>) -> Result<Value, RuleError> {
        match self {
            ValueSource::Literal(value) => Ok(value.clone()),
            ValueSource::Transform(template) => {
                template.render(original, document).map(Value::String)
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    Name(String),
    Path { placeholder: String, path: JsonPath },
}

#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    pieces: Vec<Piece>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, RuleError> {
        let chars: Vec<char> = source.chars().collect();
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '{' if chars.get(i + 1) == Some(&'{') => {
                    text.push('{');
                    i += 2;
                }
                '}' if chars.get(i + 1) == Some(&'}') => {
                    text.push('}');
                    i += 2;
                }
                '}' => return Err(RuleError::expression(source, "unmatched '}'")),
                '{' => {
                    let close = find_placeholder_end(&chars, i + 1)
                        .ok_or_else(|| RuleError::expression(source, "unterminated placeholder"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    if !text.is_empty() {
                        pieces.push(Piece::Text(std::mem::take(&mut text)));
                    }
                    pieces.push(parse_placeholder(source, inner.trim())?);
                    i = close + 1;
                }
                ch => {
                    text.push(ch);
                    i += 1;
                }
            }
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }

        Ok(Self {
            source: source.to_string(),
            pieces,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether rendering needs a structured document.
    pub fn uses_paths(&self) -> bool {
        self.pieces
            .iter()
            .any(|piece| matches!(piece, Piece::Path { .. }))
    }

    pub fn render(&self, original: &Value, document: Option<&Value>) -> Result<String, RuleError> {
        let mut context: HashMap<&str, &Value> = HashMap::new();
        context.insert(ORIGINAL, original);

        for piece in &self.pieces {
            if let Piece::Path { placeholder, path } = piece {
                let document = document.ok_or_else(|| {
                    RuleError::expression(
                        &self.source,
                        format!("'{{{placeholder}}}' requires a structured document"),
                    )
                })?;
                let value = path.first(document).unwrap_or(&EMPTY);
                context.insert(placeholder.as_str(), value);
            }
        }

        let mut out = String::new();
        for piece in &self.pieces {
            let key = match piece {
                Piece::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Piece::Name(name) => name,
                Piece::Path { placeholder, .. } => placeholder,
            };
            let value = context.get(key.as_str()).ok_or_else(|| {
                RuleError::expression(&self.source, format!("unbound name '{key}'"))
            })?;
            out.push_str(&as_text(value));
        }
        Ok(out)
    }
}

fn parse_placeholder(source: &str, inner: &str) -> Result<Piece, RuleError> {
    if inner.is_empty() {
        return Err(RuleError::expression(source, "empty placeholder"));
    }
    for prefix in PATH_PREFIXES {
        if let Some(expr) = inner.strip_prefix(prefix) {
            let path = JsonPath::parse(expr)
                .map_err(|e| RuleError::expression(source, e.to_string()))?;
            return Ok(Piece::Path {
                placeholder: inner.to_string(),
                path,
            });
        }
    }
    if inner != ORIGINAL {
        return Err(RuleError::expression(
            source,
            format!("unbound name '{inner}' (only '{ORIGINAL}' and path placeholders are available)"),
        ));
    }
    Ok(Piece::Name(inner.to_string()))
}

/// Index of the `}` closing a placeholder opened before `start`, skipping
/// braces inside quoted strings and brackets of path expressions.
fn find_placeholder_end(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = start;
    while i < chars.len() {
        let ch = chars[i];
        match quote {
            Some(q) => {
                if ch == '\\' {
                    i += 1;
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '{' => return None,
                '}' if depth == 0 => return Some(i),
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Text form of a value: strings raw, everything else as compact JSON.
pub(crate) fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
