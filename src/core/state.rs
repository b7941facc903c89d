// src/core/state.rs
//! Per-session decoder state.
//!
//! One `DecoderState` lives for one decoding session. Nothing in here is shared
//! between sessions, so two responses can be decoded side by side with separate
//! decoders over the same renderer table.

use crate::core::tag::Attributes;
use crate::json::PartialParseResult;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Nesting position of the decoder
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParserState {
    /// No tool open; text is plain prose
    #[default]
    Outside,
    /// A tool tag is open, no parameter is capturing text
    InTool { tool: String },
    /// A parameter tag of `tool` is open
    InParam { tool: String, param: String },
}

impl ParserState {
    pub fn tool(&self) -> Option<&str> {
        match self {
            ParserState::Outside => None,
            ParserState::InTool { tool } | ParserState::InParam { tool, .. } => Some(tool),
        }
    }

    pub fn param(&self) -> Option<&str> {
        match self {
            ParserState::InParam { param, .. } => Some(param),
            _ => None,
        }
    }
}

/// Completed parameter values of the open tool, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolParams(Vec<(String, String)>);

impl ToolParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value; a repeated parameter replaces the earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ToolParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = ToolParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl Serialize for ToolParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecoderState {
    pub state: ParserState,
    /// Attributes of the open tool tag
    pub attributes: Attributes,
    /// Text captured so far by the open parameter
    pub param_accumulator: String,
    pub tool_params: ToolParams,
    /// Tag token being assembled; always starts with `<` when non-empty
    pub pending: String,
    /// Reconstruction of the accumulator as of the last JSON update
    pub json_previous: PartialParseResult,
}

impl DecoderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tool(&self) -> Option<&str> {
        self.state.tool()
    }

    pub fn current_param(&self) -> Option<&str> {
        self.state.param()
    }

    pub fn open_tool(&mut self, tool: String, attributes: Attributes) {
        self.state = ParserState::InTool { tool };
        self.attributes = attributes;
        self.tool_params.clear();
    }

    pub fn open_param(&mut self, param: String) {
        if let ParserState::InTool { tool } = std::mem::take(&mut self.state) {
            self.state = ParserState::InParam { tool, param };
        }
        self.param_accumulator.clear();
        self.json_previous = PartialParseResult::empty();
    }

    /// Close the open parameter and return its name and full value.
    pub fn close_param(&mut self) -> Option<(String, String)> {
        match std::mem::take(&mut self.state) {
            ParserState::InParam { tool, param } => {
                let value = std::mem::take(&mut self.param_accumulator);
                self.json_previous = PartialParseResult::empty();
                self.tool_params.insert(param.clone(), value.clone());
                self.state = ParserState::InTool { tool };
                Some((param, value))
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Close the open tool and return its name, attributes and parameters.
    pub fn close_tool(&mut self) -> Option<(String, Attributes, ToolParams)> {
        match std::mem::take(&mut self.state) {
            ParserState::InTool { tool } => Some((
                tool,
                std::mem::take(&mut self.attributes),
                std::mem::take(&mut self.tool_params),
            )),
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_requires_tool() {
        let mut state = DecoderState::new();
        state.open_param("path".to_string());
        assert_eq!(state.state, ParserState::Outside);
        assert_eq!(state.current_param(), None);
    }

    #[test]
    fn test_tool_param_lifecycle() {
        let mut state = DecoderState::new();
        state.open_tool("write_file".to_string(), Attributes::new());
        state.open_param("path".to_string());
        assert_eq!(state.current_tool(), Some("write_file"));
        assert_eq!(state.current_param(), Some("path"));

        state.param_accumulator.push_str("a.rs");
        assert_eq!(
            state.close_param(),
            Some(("path".to_string(), "a.rs".to_string()))
        );
        assert!(state.param_accumulator.is_empty());
        assert_eq!(state.current_param(), None);

        let (tool, _, params) = state.close_tool().unwrap();
        assert_eq!(tool, "write_file");
        assert_eq!(params.get("path"), Some("a.rs"));
        assert_eq!(state.state, ParserState::Outside);
        assert!(state.tool_params.is_empty());
    }

    #[test]
    fn test_close_tool_with_open_param_is_refused() {
        let mut state = DecoderState::new();
        state.open_tool("think_deeply".to_string(), Attributes::new());
        state.open_param("thought".to_string());
        assert!(state.close_tool().is_none());
        assert_eq!(state.current_param(), Some("thought"));
    }

    #[test]
    fn test_tool_params_keep_order_and_replace() {
        let mut params: ToolParams = [("b", "1"), ("a", "2")].into_iter().collect();
        params.insert("b", "3");
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("b", "3"), ("a", "2")]);
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"b":"3","a":"2"}"#
        );
    }
}
