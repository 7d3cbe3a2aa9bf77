use super::JsonPathError;
use serde_json::{Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Child(Vec<Selector>),
    Descendant(Vec<Selector>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Selector {
    Name(String),
    Wildcard,
    Index(i64),
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },
    Filter(Box<FilterExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FilterExpr {
    Or(Box<FilterExpr>, Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Exists(FilterQuery),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
}

/// A query embedded in a filter, relative to the current node (`@`) or the
/// document root (`$`).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FilterQuery {
    pub rooted: bool,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Query(FilterQuery),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

pub(crate) fn parse(input: &str) -> Result<Vec<Segment>, JsonPathError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(JsonPathError::Empty);
    }

    let mut parser = Parser::new(trimmed);
    let mut segments = Vec::new();

    if !parser.eat('$') {
        // `user.name` is accepted as shorthand for `$.user.name`
        match parser.peek() {
            Some('.') | Some('[') => {}
            _ => {
                let name = parser.parse_name()?;
                segments.push(Segment::Child(vec![Selector::Name(name)]));
            }
        }
    }

    segments.extend(parser.parse_segments()?);

    if let Some(ch) = parser.peek() {
        return Err(parser.error(format!("unexpected character '{ch}'")));
    }

    Ok(segments)
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> JsonPathError {
        let offset = self.chars[..self.pos.min(self.chars.len())]
            .iter()
            .map(|c| c.len_utf8())
            .sum();
        JsonPathError::Syntax {
            input: self.input.to_string(),
            offset,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        let matches = expected
            .chars()
            .enumerate()
            .all(|(i, ch)| self.peek_at(i) == Some(ch));
        if matches {
            self.pos += expected.chars().count();
        }
        matches
    }

    fn expect(&mut self, expected: char) -> Result<(), JsonPathError> {
        if self.eat(expected) {
            Ok(())
        } else {
            match self.peek() {
                Some(found) => Err(self.error(format!("expected '{expected}', found '{found}'"))),
                None => Err(self.error(format!("expected '{expected}', found end of input"))),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse_segments(&mut self) -> Result<Vec<Segment>, JsonPathError> {
        let mut segments = Vec::new();
        loop {
            match self.peek() {
                Some('.') if self.peek_at(1) == Some('.') => {
                    self.pos += 2;
                    let selectors = match self.peek() {
                        Some('[') => self.parse_bracket()?,
                        Some('*') => {
                            self.pos += 1;
                            vec![Selector::Wildcard]
                        }
                        _ => vec![Selector::Name(self.parse_name()?)],
                    };
                    segments.push(Segment::Descendant(selectors));
                }
                Some('.') => {
                    self.pos += 1;
                    if self.eat('*') {
                        segments.push(Segment::Child(vec![Selector::Wildcard]));
                    } else {
                        segments.push(Segment::Child(vec![Selector::Name(self.parse_name()?)]));
                    }
                }
                Some('[') => {
                    let selectors = self.parse_bracket()?;
                    segments.push(Segment::Child(selectors));
                }
                _ => return Ok(segments),
            }
        }
    }

    fn parse_name(&mut self) -> Result<String, JsonPathError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected member name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_bracket(&mut self) -> Result<Vec<Selector>, JsonPathError> {
        self.expect('[')?;
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_selector()?);
            self.skip_whitespace();
            if self.eat(',') {
                continue;
            }
            self.expect(']')?;
            return Ok(selectors);
        }
    }

    fn parse_selector(&mut self) -> Result<Selector, JsonPathError> {
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                Ok(Selector::Wildcard)
            }
            Some('\'') | Some('"') => Ok(Selector::Name(self.parse_quoted()?)),
            Some('?') => {
                self.pos += 1;
                let expr = self.parse_or()?;
                Ok(Selector::Filter(Box::new(expr)))
            }
            Some(c) if c == '-' || c == ':' || c.is_ascii_digit() => self.parse_index_or_slice(),
            Some(c) => Err(self.error(format!("unexpected character '{c}' in selector"))),
            None => Err(self.error("unterminated bracket")),
        }
    }

    fn parse_index_or_slice(&mut self) -> Result<Selector, JsonPathError> {
        let start = self.parse_optional_int()?;
        self.skip_whitespace();
        if !self.eat(':') {
            return match start {
                Some(index) => Ok(Selector::Index(index)),
                None => Err(self.error("expected array index")),
            };
        }
        self.skip_whitespace();
        let end = self.parse_optional_int()?;
        self.skip_whitespace();
        let step = if self.eat(':') {
            self.skip_whitespace();
            self.parse_optional_int()?
        } else {
            None
        };
        Ok(Selector::Slice { start, end, step })
    }

    fn parse_optional_int(&mut self) -> Result<Option<i64>, JsonPathError> {
        let start = self.pos;
        self.eat('-');
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Ok(None);
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<i64>()
            .map(Some)
            .map_err(|_| self.error(format!("invalid integer '{text}'")))
    }

    fn parse_quoted(&mut self) -> Result<String, JsonPathError> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected quoted string")),
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    self.pos += 1;
                    let escaped = match self.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => other,
                        None => return Err(self.error("unterminated escape")),
                    };
                    out.push(escaped);
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_or(&mut self) -> Result<FilterExpr, JsonPathError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_whitespace();
            if !self.eat_str("||") {
                return Ok(left);
            }
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
    }

    fn parse_and(&mut self) -> Result<FilterExpr, JsonPathError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            if !self.eat_str("&&") {
                return Ok(left);
            }
            let right = self.parse_unary()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<FilterExpr, JsonPathError> {
        self.skip_whitespace();
        if self.peek() == Some('!') && self.peek_at(1) != Some('=') {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        if self.eat('(') {
            let inner = self.parse_or()?;
            self.skip_whitespace();
            self.expect(')')?;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<FilterExpr, JsonPathError> {
        let left = self.parse_operand()?;
        self.skip_whitespace();
        let op = match self.parse_compare_op() {
            Some(op) => op,
            None => {
                return match left {
                    Operand::Query(query) => Ok(FilterExpr::Exists(query)),
                    Operand::Literal(_) => {
                        Err(self.error("expected comparison operator after literal"))
                    }
                };
            }
        };
        self.skip_whitespace();
        let right = self.parse_operand()?;
        Ok(FilterExpr::Compare { left, op, right })
    }

    fn parse_compare_op(&mut self) -> Option<CompareOp> {
        let ops = [
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ];
        ops.into_iter()
            .find(|(token, _)| self.eat_str(token))
            .map(|(_, op)| op)
    }

    fn parse_operand(&mut self) -> Result<Operand, JsonPathError> {
        match self.peek() {
            Some('@') => {
                self.pos += 1;
                let segments = self.parse_segments()?;
                Ok(Operand::Query(FilterQuery {
                    rooted: false,
                    segments,
                }))
            }
            Some('$') => {
                self.pos += 1;
                let segments = self.parse_segments()?;
                Ok(Operand::Query(FilterQuery {
                    rooted: true,
                    segments,
                }))
            }
            Some('\'') | Some('"') => Ok(Operand::Literal(Value::String(self.parse_quoted()?))),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number().map(Operand::Literal),
            Some(c) if c.is_alphabetic() => {
                let word = self.parse_name()?;
                match word.as_str() {
                    "true" => Ok(Operand::Literal(Value::Bool(true))),
                    "false" => Ok(Operand::Literal(Value::Bool(false))),
                    "null" => Ok(Operand::Literal(Value::Null)),
                    other => Err(self.error(format!("unknown literal '{other}'"))),
                }
            }
            Some(c) => Err(self.error(format!("unexpected character '{c}' in filter"))),
            None => Err(self.error("unexpected end of filter")),
        }
    }

    fn parse_number(&mut self) -> Result<Value, JsonPathError> {
        let start = self.pos;
        self.eat('-');
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::from(int));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error(format!("invalid number '{text}'")))
    }
}
