// src/json/partial.rs
//! Best-effort reconstruction of a JSON object from a streamed prefix.
//!
//! Every call tries a fixed list of candidate completions of the prefix and keeps
//! the first one that parses as an object. Nothing here fails: a prefix that
//! cannot be completed yields an empty, complete result.

use serde::Serialize;
use serde_json::{Map, Value};

/// Object recovered from a JSON prefix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialParseResult {
    /// False when the last value is a string that has not been closed yet
    pub last_param_complete: bool,
    /// Keys in the order they appear in the prefix
    pub params: Map<String, Value>,
}

impl PartialParseResult {
    pub fn empty() -> Self {
        Self {
            last_param_complete: true,
            params: Map::new(),
        }
    }

    fn complete(params: Map<String, Value>) -> Self {
        Self {
            last_param_complete: true,
            params,
        }
    }

    fn incomplete(params: Map<String, Value>) -> Self {
        Self {
            last_param_complete: false,
            params,
        }
    }

    /// Name of the last key, if any
    pub fn last_key(&self) -> Option<&str> {
        self.params.keys().next_back().map(String::as_str)
    }
}

impl Default for PartialParseResult {
    fn default() -> Self {
        Self::empty()
    }
}

type Attempt = fn(&str) -> Option<PartialParseResult>;

/// Candidate completions, tried in order.
const ATTEMPTS: &[Attempt] = &[
    parse_as_is,
    close_object,
    close_string,
    drop_dangling_escape,
    drop_trailing_pair,
];

/// Reconstruct the best object derivable from `text`.
pub fn reconstruct(text: &str) -> PartialParseResult {
    // No completion of a prefix can turn a non-object into an object.
    if !text.trim_start().starts_with('{') {
        return PartialParseResult::empty();
    }
    ATTEMPTS
        .iter()
        .find_map(|attempt| attempt(text))
        .unwrap_or_else(|| {
            if !text.trim().is_empty() {
                crate::log_debug!("No object derivable from {} bytes of partial JSON", text.len());
            }
            PartialParseResult::empty()
        })
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn parse_as_is(text: &str) -> Option<PartialParseResult> {
    parse_object(text).map(PartialParseResult::complete)
}

/// The last value is finished but the closing brace has not arrived. A trailing
/// digit may still be growing, so numbers are never closed here.
fn close_object(text: &str) -> Option<PartialParseResult> {
    if text.chars().last().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    parse_object(&format!("{text}}}")).map(PartialParseResult::complete)
}

/// Mid-way through a string value.
fn close_string(text: &str) -> Option<PartialParseResult> {
    parse_object(&format!("{text}\"}}")).map(PartialParseResult::incomplete)
}

fn drop_dangling_escape(text: &str) -> Option<PartialParseResult> {
    let trimmed = strip_dangling_escapes(text)?;
    close_string(trimmed)
}

/// Keep everything before the last comma that leaves a parseable object.
fn drop_trailing_pair(text: &str) -> Option<PartialParseResult> {
    text.match_indices(',')
        .rev()
        .find_map(|(idx, _)| parse_object(&format!("{}}}", &text[..idx])))
        .map(PartialParseResult::complete)
}

/// Remove escape sequences cut off by the end of the stream: a lone trailing
/// backslash, a `\u` with fewer than four hex digits, or a high surrogate
/// whose low half has not arrived. Returns `None` when nothing was removed.
fn strip_dangling_escapes(text: &str) -> Option<&str> {
    let mut current = text;
    while let Some(cut) = dangling_escape_start(current) {
        current = &current[..cut];
    }
    (current.len() < text.len()).then_some(current)
}

fn dangling_escape_start(text: &str) -> Option<usize> {
    if trailing_backslashes(text) % 2 == 1 {
        return Some(text.len() - 1);
    }

    let bytes = text.as_bytes();
    let hex = bytes
        .iter()
        .rev()
        .take_while(|b| b.is_ascii_hexdigit())
        .take(4)
        .count();
    let u = bytes.len().checked_sub(hex + 1)?;
    if u == 0 || bytes[u] != b'u' {
        return None;
    }
    let slash = u - 1;
    if bytes[slash] != b'\\' || trailing_backslashes(&text[..=slash]) % 2 == 0 {
        return None;
    }
    if hex < 4 {
        return Some(slash);
    }
    let code = u16::from_str_radix(&text[u + 1..], 16).ok()?;
    (0xD800..=0xDBFF).contains(&code).then_some(slash)
}

fn trailing_backslashes(text: &str) -> usize {
    text.bytes().rev().take_while(|b| *b == b'\\').count()
}
