//! JSONPath queries over `serde_json` documents.
//!
//! Supports the common JSONPath surface:
//! - `$.user.name`, `$['odd key']` - child access
//! - `$.items[*]`, `$.items.*` - wildcards
//! - `$.items[0]`, `$.items[-1]`, `$.items[1:3]`, `$.items[0,2]` - indices, slices, unions
//! - `$..name` - descendant search
//! - `$.items[?(@.price < 10 && @.tags)]` - filter predicates
//!
//! Every result is paired with its normalized [`Location`], which is what the
//! structural engine writes back through.

mod location;
mod parser;
mod query;

pub use location::{Location, Step};

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonPathError {
    #[error("empty path expression")]
    Empty,

    #[error("invalid path expression '{input}' at offset {offset}: {message}")]
    Syntax {
        input: String,
        /// Byte offset into `input`.
        offset: usize,
        message: String,
    },
}

/// A compiled path expression.
#[derive(Debug, Clone)]
pub struct JsonPath {
    source: String,
    segments: Vec<parser::Segment>,
}

impl JsonPath {
    pub fn parse(input: &str) -> Result<Self, JsonPathError> {
        let segments = parser::parse(input)?;
        Ok(Self {
            source: input.trim().to_string(),
            segments,
        })
    }

    /// The expression as written in the rule.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// All matching values, in document order.
    pub fn query<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        self.query_located(root)
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    /// All matching values with their normalized locations, in document order.
    pub fn query_located<'a>(&self, root: &'a Value) -> Vec<(Location, &'a Value)> {
        query::evaluate(&self.segments, root, root, Location::root())
    }

    /// Locations only; the borrow of `root` ends when this returns.
    pub fn locate(&self, root: &Value) -> Vec<Location> {
        self.query_located(root)
            .into_iter()
            .map(|(location, _)| location)
            .collect()
    }

    pub fn first<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.query_located(root)
            .into_iter()
            .next()
            .map(|(_, value)| value)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for JsonPath {
    type Err = JsonPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
