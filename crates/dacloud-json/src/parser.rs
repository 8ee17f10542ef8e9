//! Recursive-descent decoder for the lenient JSON dialect
//!
//! One [`Parser`] owns a cursor into the input. Nested objects and arrays are
//! decoded by re-entering the same parser, so every level shares one cursor.

use crate::error::{DecodeError, Result};
use crate::value::{JsonMap, JsonValue};

/// Characters that end an unquoted scalar
const DELIMITERS: &[char] = &[',', ':', ']', '}', '/', '\\', '"', '[', '{', ';', '=', '#'];

/// Deepest nesting of objects and arrays accepted
pub const MAX_DEPTH: usize = 512;

/// Cursor-based decoder over a borrowed input string
pub struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Decode a top-level object. Text after the closing brace is ignored.
    pub fn parse_document(&mut self) -> Result<JsonMap> {
        self.skip_whitespace();
        self.parse_object()
    }

    /// Peek at the current character without consuming it
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Consume and return the current character
    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> DecodeError {
        DecodeError::bad_data(message, self.pos)
    }

    /// Decode `{ key : value , ... }`
    pub fn parse_object(&mut self) -> Result<JsonMap> {
        self.descend()?;
        let result = self.object_members();
        self.depth -= 1;
        result
    }

    fn object_members(&mut self) -> Result<JsonMap> {
        if self.bump() != Some('{') {
            return Err(self.error("A Json object text must begin with '{'"));
        }

        let mut map = JsonMap::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error("A Json object text must end with '}'")),
                Some('}') => {
                    self.bump();
                    return Ok(map);
                }
                Some(_) => {}
            }

            let key_pos = self.pos;
            let key = match self.parse_value()? {
                JsonValue::Null => return Err(DecodeError::bad_data("Null key", key_pos)),
                other => other.to_string(),
            };

            self.skip_whitespace();
            if self.bump() != Some(':') {
                return Err(self.error("Expected a ':' after a key"));
            }

            let value = self.parse_value()?;
            if value.is_null() {
                map.shift_remove(&key);
            } else {
                map.insert(key, value);
            }

            self.skip_whitespace();
            match self.bump() {
                Some(',') => {
                    self.skip_whitespace();
                    if self.peek() == Some('}') {
                        self.bump();
                        return Ok(map);
                    }
                }
                Some('}') => return Ok(map),
                _ => return Err(self.error("Expected a ',' or '}'")),
            }
        }
    }

    /// Decode `[a, b]` or `(a, b)` into an integer-keyed map
    pub fn parse_array(&mut self) -> Result<JsonMap> {
        self.descend()?;
        let result = self.array_elements();
        self.depth -= 1;
        result
    }

    fn array_elements(&mut self) -> Result<JsonMap> {
        let closer = match self.bump() {
            Some('[') => ']',
            Some('(') => ')',
            _ => return Err(self.error("A Json Array text must start with '['")),
        };

        let mut list = JsonMap::new();
        self.skip_whitespace();
        if self.peek() == Some(closer) {
            self.bump();
            return Ok(list);
        }

        loop {
            self.skip_whitespace();
            let element = if self.peek() == Some(',') {
                JsonValue::Null
            } else {
                self.parse_value()?
            };
            list.insert(list.len().to_string(), element);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => {
                    self.skip_whitespace();
                    if self.peek() == Some(closer) {
                        self.bump();
                        return Ok(list);
                    }
                }
                Some(c @ (']' | ')')) => {
                    if c != closer {
                        return Err(self.error(format!("Expected a '{closer}'")));
                    }
                    return Ok(list);
                }
                _ => return Err(self.error("Expected a ',' or ']'")),
            }
        }
    }

    fn descend(&mut self) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("Nesting too deep"));
        }
        self.depth += 1;
        Ok(())
    }

    /// Decode any value at the cursor
    pub fn parse_value(&mut self) -> Result<JsonValue> {
        self.skip_whitespace();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                self.parse_string(quote).map(JsonValue::String)
            }
            Some('{') => self.parse_object().map(JsonValue::Object),
            Some('[' | '(') => self.parse_array().map(JsonValue::Array),
            _ => self.parse_unquoted(),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated string")),
                Some(c) if c < ' ' => return Err(self.error("Unterminated string")),
                Some('\\') => self.parse_escape(&mut out)?,
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<()> {
        match self.bump() {
            None => return Err(self.error("Unterminated string")),
            Some('b') => out.push('\u{8}'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('f') => out.push('\u{c}'),
            Some('r') => out.push('\r'),
            Some('u') => {
                let unit = self.take_hex(4)?;
                out.push(self.decode_utf16(unit)?);
            }
            Some('x') => {
                let byte = self.take_hex(2)?;
                out.push(char::from_u32(byte).ok_or_else(|| self.error("Illegal escape"))?);
            }
            Some(other) => out.push(other),
        }
        Ok(())
    }

    /// Combine a UTF-16 unit with a following low surrogate if needed
    fn decode_utf16(&mut self, unit: u32) -> Result<char> {
        if !(0xD800..0xDC00).contains(&unit) {
            return char::from_u32(unit).ok_or_else(|| self.error("Illegal escape"));
        }

        if !self.input[self.pos..].starts_with("\\u") {
            return Err(self.error("Illegal escape"));
        }
        self.pos += 2;
        let low = self.take_hex(4)?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(self.error("Illegal escape"));
        }
        let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(combined).ok_or_else(|| self.error("Illegal escape"))
    }

    fn take_hex(&mut self, len: usize) -> Result<u32> {
        let rest = &self.input[self.pos..];
        let digits: String = rest.chars().take(len).collect();
        if digits.chars().count() < len {
            return Err(self.error("Substring bounds error"));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.error("Illegal escape"));
        }
        let value = u32::from_str_radix(&digits, 16).map_err(|_| self.error("Illegal escape"))?;
        self.pos += digits.len();
        Ok(value)
    }

    fn parse_unquoted(&mut self) -> Result<JsonValue> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch < ' ' || DELIMITERS.contains(&ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }

        let token = self.input[start..self.pos].trim();
        if token.is_empty() {
            return Err(DecodeError::bad_data("Missing value", start));
        }
        Ok(resolve_scalar(token))
    }
}

/// Resolve an unquoted token into a boolean, null, number or plain string
pub fn resolve_scalar(token: &str) -> JsonValue {
    if token.eq_ignore_ascii_case("true") {
        return JsonValue::Bool(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return JsonValue::Bool(false);
    }
    if token.eq_ignore_ascii_case("null") {
        return JsonValue::Null;
    }

    match token.chars().next() {
        Some(c) if c.is_ascii_digit() || matches!(c, '.' | '-' | '+') => {
            parse_number(token).unwrap_or_else(|| JsonValue::String(token.to_string()))
        }
        _ => JsonValue::String(token.to_string()),
    }
}

fn parse_number(token: &str) -> Option<JsonValue> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        if let Some(value) = parse_radix(hex, 16) {
            return Some(value);
        }
    } else if token.len() > 1
        && token.starts_with('0')
        && let Some(value) = parse_radix(&token[1..], 8)
    {
        return Some(value);
    }

    if let Ok(i) = token.parse::<i32>() {
        return Some(JsonValue::Int(i));
    }
    if let Ok(l) = token.parse::<i64>() {
        return Some(JsonValue::Long(l));
    }
    token
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
        .map(JsonValue::Double)
}

fn parse_radix(digits: &str, radix: u32) -> Option<JsonValue> {
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    if let Ok(i) = i32::from_str_radix(digits, radix) {
        return Some(JsonValue::Int(i));
    }
    i64::from_str_radix(digits, radix).ok().map(JsonValue::Long)
}
