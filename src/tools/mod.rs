// src/tools/mod.rs
//! Tool call vocabulary, rendering and structured results
//!
//! The decoders in [`crate::core`] know nothing about what a tool means. This
//! module supplies the vocabulary they recognize, the renderer table that turns
//! their events into terminal text, and the snapshot types handed to whoever
//! executes the tools.

pub mod helpers;
pub mod renderer;
pub mod renderers;
pub mod schema;

use crate::core::tag::Attributes;
use crate::core::{StreamDecoder, TagStreamDecoder, ToolParams};
use crate::json::DeltaResult;
use serde::Serialize;
use std::sync::Arc;

pub use renderer::{RendererEntry, RendererTable};
pub use schema::{ParamKind, ToolSpec, ToolVocabulary};

/// One parameter of a tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSnapshot {
    pub name: String,
    pub value: String,
    /// False while the closing parameter tag has not been seen
    pub complete: bool,
}

/// Structured view of a tool call, finished or in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallSnapshot {
    pub name: String,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub params: Vec<ParamSnapshot>,
    pub complete: bool,
}

impl ToolCallSnapshot {
    /// Snapshot of a closed tool
    pub fn finished(name: String, attributes: Attributes, params: &ToolParams) -> Self {
        Self {
            name,
            attributes,
            params: params
                .iter()
                .map(|(name, value)| ParamSnapshot {
                    name: name.to_string(),
                    value: value.to_string(),
                    complete: true,
                })
                .collect(),
            complete: true,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Completed parameters only
    pub fn completed_params(&self) -> ToolParams {
        self.params
            .iter()
            .filter(|p| p.complete)
            .map(|p| (p.name.as_str(), p.value.as_str()))
            .collect()
    }
}

/// Live change to a JSON object parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonParamUpdate {
    pub tool: String,
    pub param: String,
    pub update: DeltaResult,
}

/// Parse every tool call in a complete message.
///
/// Runs the streaming decoder over `text` in one go with all rendering
/// suppressed. Parameter values are trimmed; unterminated calls are dropped.
pub fn parse_tool_calls(text: &str, vocabulary: Arc<ToolVocabulary>) -> Vec<ToolCallSnapshot> {
    let mut decoder = TagStreamDecoder::new(vocabulary, Arc::new(RendererTable::silent()));
    decoder.process(text);
    decoder.end();
    decoder
        .take_completed()
        .into_iter()
        .map(|mut call| {
            for param in &mut call.params {
                let trimmed = param.value.trim();
                if trimmed.len() != param.value.len() {
                    param.value = trimmed.to_string();
                }
            }
            call
        })
        .collect()
}
