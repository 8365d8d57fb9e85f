//! Flat JSON object scanning for small request bodies.
//!
//! Only top-level members are surfaced. Nested values are skipped, and a
//! syntax error ends iteration without discarding members already read.

use heapless::String;

use crate::error::ConfigParseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonValue<'a> {
    /// Raw number text.
    Number(&'a str),
    /// Raw string contents, escapes not yet decoded.
    String(&'a str),
    Bool(bool),
    Null,
    Nested,
}

impl<'a> JsonValue<'a> {
    /// Non-negative integer that fits `u32`; fractions and exponents are
    /// rejected.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Number(raw) => raw.parse::<u32>().ok(),
            _ => None,
        }
    }

    pub fn decode_string<const N: usize>(&self) -> Option<String<N>> {
        let Self::String(raw) = self else {
            return None;
        };
        let mut out = String::new();
        let mut chars = raw.chars();
        while let Some(ch) = chars.next() {
            let decoded = if ch == '\\' {
                match chars.next()? {
                    '"' => '"',
                    '\\' => '\\',
                    '/' => '/',
                    'b' => '\u{8}',
                    'f' => '\u{c}',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'u' => {
                        let mut code = 0u32;
                        for _ in 0..4 {
                            code = code * 16 + chars.next()?.to_digit(16)?;
                        }
                        char::from_u32(code)?
                    }
                    _ => return None,
                }
            } else {
                ch
            };
            out.push(decoded).ok()?;
        }
        Some(out)
    }
}

pub struct JsonObject<'a> {
    body: &'a str,
}

impl<'a> JsonObject<'a> {
    pub fn parse(body: &'a [u8], limit: usize) -> Result<Self, ConfigParseError> {
        if body.len() > limit {
            return Err(ConfigParseError::TooLarge);
        }
        let text = core::str::from_utf8(body).map_err(|_| ConfigParseError::Utf8)?;
        let text = text.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0');
        let inner = text
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or(ConfigParseError::NotAnObject)?;
        Ok(Self { body: inner })
    }

    pub fn members(&self) -> Members<'a> {
        Members {
            rest: self.body,
            done: false,
        }
    }

    /// First member named `key`.
    pub fn get(&self, key: &str) -> Option<JsonValue<'a>> {
        self.members()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value)
    }
}

pub struct Members<'a> {
    rest: &'a str,
    done: bool,
}

impl<'a> Iterator for Members<'a> {
    type Item = (&'a str, JsonValue<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let member = self.next_member();
        if member.is_none() {
            self.done = true;
        }
        member
    }
}

impl<'a> Members<'a> {
    fn next_member(&mut self) -> Option<(&'a str, JsonValue<'a>)> {
        let mut rest = self.rest.trim_start();
        if let Some(after_comma) = rest.strip_prefix(',') {
            rest = after_comma.trim_start();
        }
        let (key, after_key) = scan_string(rest.strip_prefix('"')?)?;
        let after_colon = after_key.trim_start().strip_prefix(':')?.trim_start();
        let (value, after_value) = scan_value(after_colon)?;

        let after_value = after_value.trim_start();
        if !(after_value.is_empty() || after_value.starts_with(',')) {
            return None;
        }
        self.rest = after_value;
        Some((key, value))
    }
}

/// `input` starts just after an opening quote. Returns the raw contents and
/// the text after the closing quote.
fn scan_string(input: &str) -> Option<(&str, &str)> {
    let bytes = input.as_bytes();
    let mut at = 0usize;
    while at < bytes.len() {
        match bytes[at] {
            b'\\' => at += 2,
            b'"' => return Some((&input[..at], &input[at + 1..])),
            _ => at += 1,
        }
    }
    None
}

fn scan_value(input: &str) -> Option<(JsonValue<'_>, &str)> {
    let first = *input.as_bytes().first()?;
    match first {
        b'"' => {
            let (raw, rest) = scan_string(&input[1..])?;
            Some((JsonValue::String(raw), rest))
        }
        b'{' | b'[' => {
            let end = skip_nested(input)?;
            Some((JsonValue::Nested, &input[end..]))
        }
        b't' => input.strip_prefix("true").map(|rest| (JsonValue::Bool(true), rest)),
        b'f' => input.strip_prefix("false").map(|rest| (JsonValue::Bool(false), rest)),
        b'n' => input.strip_prefix("null").map(|rest| (JsonValue::Null, rest)),
        b'-' | b'0'..=b'9' => {
            let end = input
                .find(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')))
                .unwrap_or(input.len());
            Some((JsonValue::Number(&input[..end]), &input[end..]))
        }
        _ => None,
    }
}

/// Byte offset just past the bracketed value starting `input`.
fn skip_nested(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut at = 0usize;
    while at < bytes.len() {
        match bytes[at] {
            b'"' => {
                let (_, rest) = scan_string(&input[at + 1..])?;
                at = input.len() - rest.len();
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(at + 1);
                }
            }
            _ => {}
        }
        at += 1;
    }
    None
}
