//! In-memory file content: a JSON tree or a list of lines.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

/// A file's content, decided once when the file is read.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Structured(Value),
    Textual(Vec<String>),
}

/// Formatting of the raw content that survives a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    pub trailing_newline: bool,
}

impl Document {
    /// Classify raw content. Only objects and arrays count as structured;
    /// a file holding a bare JSON scalar is treated as text.
    pub fn classify(raw: &str) -> (Document, Layout) {
        let normalized = raw.replace("\r\n", "\n");
        let layout = Layout {
            trailing_newline: normalized.ends_with('\n'),
        };
        (Self::from_text(&normalized), layout)
    }

    /// Build from text already normalized to `\n` line endings.
    pub fn from_text(text: &str) -> Document {
        match serde_json::from_str::<Value>(text) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Document::Structured(value),
            _ => Document::Textual(split_lines(text)),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Document::Structured(_))
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Document::Structured(value) => Some(value),
            Document::Textual(_) => None,
        }
    }

    /// The lines the textual engine operates on. Structured documents are
    /// serialized in canonical form first.
    pub fn to_lines(&self) -> Result<Vec<String>, serde_json::Error> {
        match self {
            Document::Structured(value) => Ok(split_lines(&canonical_json(value)?)),
            Document::Textual(lines) => Ok(lines.clone()),
        }
    }

    /// Serialize for persistence.
    pub fn render(&self, layout: Layout) -> Result<String, serde_json::Error> {
        let mut out = match self {
            Document::Structured(value) => canonical_json(value)?,
            Document::Textual(lines) => lines.join("\n"),
        };
        if layout.trailing_newline {
            out.push('\n');
        }
        Ok(out)
    }
}

/// Four-space indented JSON with member order preserved.
pub fn canonical_json(value: &Value) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Split on `\n`, dropping the empty piece a trailing newline would leave.
/// Empty text has no lines.
fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n').map(String::from).collect()
}
