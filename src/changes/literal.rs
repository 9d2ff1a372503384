//! Strict parser for mapping literals such as `{1: 0, 2: 1}` or
//! `{1: 'Male', 2: 'Female'}`.
//!
//! The accepted grammar is deliberately small: a brace-delimited list of
//! `key: value` entries where keys and values are integers, floats, quoted
//! strings, `True`, `False`, or `None`. Nothing is evaluated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Scalar;

/// Error raised when a literal does not follow the mapping grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Ordered raw → harmonised value pairs with unique raw keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueMap {
    entries: Vec<(Scalar, Scalar)>,
}

impl ValueMap {
    pub fn parse(source: &str) -> Result<Self, LiteralError> {
        Parser::new(source).parse_map()
    }

    pub fn entries(&self) -> &[(Scalar, Scalar)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the harmonised value for `raw`.
    pub fn get(&self, raw: &Scalar) -> Option<&Scalar> {
        self.entries
            .iter()
            .find(|(key, _)| key.matches(raw))
            .map(|(_, value)| value)
    }

    /// Applies the map to a single value; unmapped values pass through.
    pub fn apply(&self, raw: &Scalar) -> Scalar {
        match self.get(raw) {
            Some(replacement) => replacement.coerce_like(raw),
            None => raw.clone(),
        }
    }

    /// Distinct harmonised values in first-seen order.
    pub fn targets(&self) -> Vec<&Scalar> {
        let mut targets: Vec<&Scalar> = Vec::new();
        for (_, value) in &self.entries {
            if !targets.iter().any(|seen| seen.matches(value)) {
                targets.push(value);
            }
        }
        targets
    }

    /// Keys that would match the same cell count as duplicates, so `1` and
    /// `1.0` cannot both appear.
    fn insert(&mut self, key: Scalar, value: Scalar, offset: usize) -> Result<(), LiteralError> {
        if self.entries.iter().any(|(existing, _)| existing.matches(&key)) {
            return Err(LiteralError {
                offset,
                message: format!("duplicate key {key}"),
            });
        }
        self.entries.push((key, value));
        Ok(())
    }
}

impl FromStr for ValueMap {
    type Err = LiteralError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        ValueMap::parse(source)
    }
}

impl fmt::Display for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (index, (key, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn parse_map(mut self) -> Result<ValueMap, LiteralError> {
        let mut map = ValueMap::default();
        self.skip_whitespace();
        self.expect('{')?;
        self.skip_whitespace();

        if self.peek() == Some('}') {
            self.bump();
        } else {
            loop {
                let key_offset = self.pos;
                let key = self.parse_scalar()?;
                self.skip_whitespace();
                self.expect(':')?;
                let value = self.parse_scalar()?;
                map.insert(key, value, key_offset)?;
                self.skip_whitespace();

                match self.bump() {
                    Some(',') => {
                        self.skip_whitespace();
                        if self.peek() == Some('}') {
                            self.bump();
                            break;
                        }
                    }
                    Some('}') => break,
                    Some(other) => {
                        return Err(self.error_at(
                            self.pos - other.len_utf8(),
                            format!("expected ',' or '}}', found '{other}'"),
                        ));
                    }
                    None => return Err(self.error("unterminated mapping")),
                }
            }
        }

        self.skip_whitespace();
        if let Some(other) = self.peek() {
            return Err(self.error(format!("unexpected trailing input '{other}'")));
        }
        Ok(map)
    }

    fn parse_scalar(&mut self) -> Result<Scalar, LiteralError> {
        self.skip_whitespace();
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                self.parse_string(quote)
            }
            Some(ch) if ch == '-' || ch == '+' || ch == '.' || ch.is_ascii_digit() => {
                self.parse_number()
            }
            Some(ch) if ch.is_ascii_alphabetic() => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
                    self.bump();
                }
                match &self.source[start..self.pos] {
                    "True" => Ok(Scalar::Bool(true)),
                    "False" => Ok(Scalar::Bool(false)),
                    "None" => Ok(Scalar::Null),
                    other => Err(self.error_at(start, format!("unsupported identifier '{other}'"))),
                }
            }
            Some(other) => Err(self.error(format!("expected a literal, found '{other}'"))),
            None => Err(self.error("expected a literal, found end of input")),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<Scalar, LiteralError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(ch) if ch == quote => return Ok(Scalar::Text(text)),
                Some('\\') => match self.bump() {
                    Some('\\') => text.push('\\'),
                    Some('\'') => text.push('\''),
                    Some('"') => text.push('"'),
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(other) => {
                        return Err(self.error(format!("unsupported escape '\\{other}'")));
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some(ch) => text.push(ch),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Scalar, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        let mut is_float = false;
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('-' | '+')) {
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }

        let raw: String = self.source[start..self.pos]
            .chars()
            .filter(|ch| *ch != '_')
            .collect();
        let parsed = if is_float {
            raw.parse::<f64>().ok().map(Scalar::Float)
        } else {
            raw.parse::<i64>().ok().map(Scalar::Int)
        };
        parsed.ok_or_else(|| {
            self.error_at(start, format!("invalid number '{}'", &self.source[start..self.pos]))
        })
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump();
                Ok(())
            }
            Some(other) => Err(self.error(format!("expected '{expected}', found '{other}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_recode() {
        let map = ValueMap::parse("{1: 0, 2: 1}").expect("valid literal");
        assert_eq!(
            map.entries(),
            &[
                (Scalar::Int(1), Scalar::Int(0)),
                (Scalar::Int(2), Scalar::Int(1))
            ]
        );
    }

    #[test]
    fn parses_mixed_literals() {
        let map = ValueMap::parse(r#" { -1.5: "a\"b", 'x': None, 3: True, } "#)
            .expect("valid literal");
        assert_eq!(map.len(), 3);
        assert_eq!(map.entries()[0], (Scalar::Float(-1.5), Scalar::Text("a\"b".into())));
        assert_eq!(map.entries()[1], (Scalar::Text("x".into()), Scalar::Null));
        assert_eq!(map.entries()[2], (Scalar::Int(3), Scalar::Bool(true)));
    }

    #[test]
    fn empty_map_is_accepted() {
        assert!(ValueMap::parse("{}").expect("empty literal").is_empty());
    }

    #[test]
    fn rejects_code_and_garbage() {
        assert!(ValueMap::parse("__import__('os')").is_err());
        assert!(ValueMap::parse("{1: 0").is_err());
        assert!(ValueMap::parse("{1 0}").is_err());
        assert!(ValueMap::parse("{1: 0} extra").is_err());
        assert!(ValueMap::parse("{1: foo}").is_err());
        assert!(ValueMap::parse("{'a: 1}").is_err());
    }

    #[test]
    fn rejects_duplicate_keys() {
        let error = ValueMap::parse("{1: 0, 1: 2}").expect_err("duplicate key");
        assert!(error.message.contains("duplicate"));
        assert_eq!(error.offset, 7);
    }

    #[test]
    fn rejects_numerically_equal_keys() {
        let error = ValueMap::parse("{1: 0, 1.0: 5}").expect_err("duplicate key");
        assert!(error.message.contains("duplicate"));
        assert_eq!(error.offset, 7);
        assert!(ValueMap::parse("{1: 0, '1': 5}").is_ok());
    }

    #[test]
    fn apply_passes_unmapped_values_through() {
        let map = ValueMap::parse("{1: 0, 2: 1}").expect("valid literal");
        assert_eq!(map.apply(&Scalar::Float(1.0)), Scalar::Float(0.0));
        assert_eq!(map.apply(&Scalar::Int(2)), Scalar::Int(1));
        assert_eq!(map.apply(&Scalar::Int(7)), Scalar::Int(7));
        assert_eq!(map.apply(&Scalar::Null), Scalar::Null);
    }

    #[test]
    fn display_renders_parseable_literal() {
        let source = "{1: 'Male', 2: 'Don\\'t know', 3.5: None}";
        let map = ValueMap::parse(source).expect("valid literal");
        assert_eq!(map.to_string(), source);
        assert_eq!(ValueMap::parse(&map.to_string()).expect("reparse"), map);
    }

    #[test]
    fn targets_are_distinct() {
        let map = ValueMap::parse("{1: 0, 2: 0, 3: 1}").expect("valid literal");
        assert_eq!(map.targets(), vec![&Scalar::Int(0), &Scalar::Int(1)]);
    }
}
