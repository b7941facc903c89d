// src/tools/renderer.rs
//! Renderer dispatch table
//!
//! Maps tool names to a [`RendererEntry`] of optional callbacks. Every callback
//! returns `Some(text)` to emit text or `None` to emit nothing. A callback left
//! unset on an entry falls back to the table's default entry for that callback
//! only, so entries override as little or as much as they need.

use super::helpers::{snake_to_title_case, Theme};
use crate::core::tag::Attributes;
use crate::core::ToolParams;
use crate::json::DeltaResult;
use std::collections::HashMap;
use std::sync::Arc;

/// `(tool, attributes)`
pub type ToolStartFn = Arc<dyn Fn(&str, &Attributes) -> Option<String> + Send + Sync>;
/// `(param, tool)`
pub type ParamStartFn = Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>;
/// `(chunk, param, tool)`
pub type ParamChunkFn = Arc<dyn Fn(&str, &str, &str) -> Option<String> + Send + Sync>;
/// `(param, tool, full value)`
pub type ParamEndFn = Arc<dyn Fn(&str, &str, &str) -> Option<String> + Send + Sync>;
/// `(tool, completed params)`
pub type ToolEndFn = Arc<dyn Fn(&str, &ToolParams) -> Option<String> + Send + Sync>;
/// `(delta, param, tool)`
pub type JsonDeltaFn = Arc<dyn Fn(&DeltaResult, &str, &str) -> Option<String> + Send + Sync>;
/// Plain text outside any tool
pub type TextFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct RendererEntry {
    pub on_tool_start: Option<ToolStartFn>,
    pub on_param_start: Option<ParamStartFn>,
    pub on_param_chunk: Option<ParamChunkFn>,
    pub on_param_end: Option<ParamEndFn>,
    pub on_tool_end: Option<ToolEndFn>,
    pub on_json_delta: Option<JsonDeltaFn>,
}

impl std::fmt::Debug for RendererEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererEntry")
            .field("on_tool_start", &self.on_tool_start.is_some())
            .field("on_param_start", &self.on_param_start.is_some())
            .field("on_param_chunk", &self.on_param_chunk.is_some())
            .field("on_param_end", &self.on_param_end.is_some())
            .field("on_tool_end", &self.on_tool_end.is_some())
            .field("on_json_delta", &self.on_json_delta.is_some())
            .finish()
    }
}

impl RendererEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry that suppresses every event
    pub fn silent() -> Self {
        Self::new()
            .on_tool_start(|_, _| None)
            .on_param_start(|_, _| None)
            .on_param_chunk(|_, _, _| None)
            .on_param_end(|_, _, _| None)
            .on_tool_end(|_, _| None)
            .on_json_delta(|_, _, _| None)
    }

    /// Default rendering: a title-cased header, parameter text passed through.
    pub fn default_for(theme: Theme) -> Self {
        Self::new()
            .on_tool_start(move |tool, _| Some(theme.header(&snake_to_title_case(tool))))
            .on_param_start(|_, _| None)
            .on_param_chunk(move |content, _, _| Some(theme.gray(content)))
            .on_param_end(|_, _, _| None)
            .on_tool_end(|_, _| None)
            .on_json_delta(|_, _, _| None)
    }

    pub fn on_tool_start(
        mut self,
        f: impl Fn(&str, &Attributes) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.on_tool_start = Some(Arc::new(f));
        self
    }

    pub fn on_param_start(
        mut self,
        f: impl Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.on_param_start = Some(Arc::new(f));
        self
    }

    pub fn on_param_chunk(
        mut self,
        f: impl Fn(&str, &str, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.on_param_chunk = Some(Arc::new(f));
        self
    }

    pub fn on_param_end(
        mut self,
        f: impl Fn(&str, &str, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.on_param_end = Some(Arc::new(f));
        self
    }

    pub fn on_tool_end(
        mut self,
        f: impl Fn(&str, &ToolParams) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.on_tool_end = Some(Arc::new(f));
        self
    }

    pub fn on_json_delta(
        mut self,
        f: impl Fn(&DeltaResult, &str, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.on_json_delta = Some(Arc::new(f));
        self
    }

    /// Fill unset callbacks from `fallback`.
    fn or(self, fallback: &RendererEntry) -> Self {
        Self {
            on_tool_start: self.on_tool_start.or_else(|| fallback.on_tool_start.clone()),
            on_param_start: self.on_param_start.or_else(|| fallback.on_param_start.clone()),
            on_param_chunk: self.on_param_chunk.or_else(|| fallback.on_param_chunk.clone()),
            on_param_end: self.on_param_end.or_else(|| fallback.on_param_end.clone()),
            on_tool_end: self.on_tool_end.or_else(|| fallback.on_tool_end.clone()),
            on_json_delta: self.on_json_delta.or_else(|| fallback.on_json_delta.clone()),
        }
    }
}

/// Read-only after construction; share it between sessions behind an `Arc`.
#[derive(Clone)]
pub struct RendererTable {
    entries: HashMap<String, RendererEntry>,
    fallback: RendererEntry,
    text: Option<TextFn>,
}

impl std::fmt::Debug for RendererTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tools: Vec<&String> = self.entries.keys().collect();
        tools.sort();
        f.debug_struct("RendererTable")
            .field("entries", &tools)
            .field("fallback", &self.fallback)
            .field("text", &self.text.is_some())
            .finish()
    }
}

impl Default for RendererTable {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl RendererTable {
    /// Empty table using the default rendering for every tool
    pub fn new(theme: Theme) -> Self {
        Self {
            entries: HashMap::new(),
            fallback: RendererEntry::default_for(theme),
            text: None,
        }
    }

    /// Table that renders nothing for any tool. Plain text still passes through.
    pub fn silent() -> Self {
        Self {
            entries: HashMap::new(),
            fallback: RendererEntry::silent(),
            text: None,
        }
    }

    /// One renderer for every tool. Its unset callbacks use the default rendering.
    pub fn single(entry: RendererEntry, theme: Theme) -> Self {
        Self {
            entries: HashMap::new(),
            fallback: entry.or(&RendererEntry::default_for(theme)),
            text: None,
        }
    }

    pub fn with_entry(mut self, tool: impl Into<String>, entry: RendererEntry) -> Self {
        self.insert(tool, entry);
        self
    }

    pub fn insert(&mut self, tool: impl Into<String>, entry: RendererEntry) {
        self.entries.insert(tool.into(), entry);
    }

    /// Transform applied to plain text outside tools
    pub fn with_text_transform(
        mut self,
        f: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.text = Some(Arc::new(f));
        self
    }

    pub fn entry(&self, tool: &str) -> Option<&RendererEntry> {
        self.entries.get(tool)
    }

    pub fn contains(&self, tool: &str) -> bool {
        self.entries.contains_key(tool)
    }

    fn resolve<'a, T>(
        &'a self,
        tool: &str,
        field: impl Fn(&'a RendererEntry) -> &'a Option<T>,
    ) -> Option<&'a T> {
        self.entries
            .get(tool)
            .and_then(|entry| field(entry).as_ref())
            .or_else(|| field(&self.fallback).as_ref())
    }

    pub fn tool_start(&self, tool: &str, attributes: &Attributes) -> Option<String> {
        self.resolve(tool, |e| &e.on_tool_start)
            .and_then(|f| f(tool, attributes))
    }

    pub fn param_start(&self, param: &str, tool: &str) -> Option<String> {
        self.resolve(tool, |e| &e.on_param_start)
            .and_then(|f| f(param, tool))
    }

    pub fn param_chunk(&self, content: &str, param: &str, tool: &str) -> Option<String> {
        self.resolve(tool, |e| &e.on_param_chunk)
            .and_then(|f| f(content, param, tool))
    }

    pub fn param_end(&self, param: &str, tool: &str, content: &str) -> Option<String> {
        self.resolve(tool, |e| &e.on_param_end)
            .and_then(|f| f(param, tool, content))
    }

    pub fn tool_end(&self, tool: &str, params: &ToolParams) -> Option<String> {
        self.resolve(tool, |e| &e.on_tool_end)
            .and_then(|f| f(tool, params))
    }

    pub fn json_delta(&self, delta: &DeltaResult, param: &str, tool: &str) -> Option<String> {
        self.resolve(tool, |e| &e.on_json_delta)
            .and_then(|f| f(delta, param, tool))
    }

    /// Plain text is forwarded unchanged unless a transform is registered.
    pub fn plain_text(&self, text: &str) -> Option<String> {
        match &self.text {
            Some(f) => f(text),
            None => Some(text.to_string()),
        }
    }
}
