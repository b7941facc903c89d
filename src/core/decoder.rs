// src/core/decoder.rs
//! Incremental decoder for tool calls written as XML-style tags.
//!
//! Input is consumed one character at a time, so the result never depends on
//! where chunk boundaries fall. Text is released at the end of every
//! [`StreamDecoder::process`] call; only a partially received tag token is held
//! back until the next chunk decides what it is.

use super::state::{DecoderState, ParserState};
use super::tag::{scan, Attributes, NameSet, TagContext, TagScan};
use crate::json::delta_from;
use crate::tools::{
    JsonParamUpdate, ParamKind, ParamSnapshot, RendererTable, ToolCallSnapshot, ToolVocabulary,
};
use std::sync::Arc;

/// Longest tag token buffered before it is released as text
pub const DEFAULT_MAX_TAG_LEN: usize = 256;

/// Receives every non-empty output fragment as it is produced
pub type Sink = Box<dyn FnMut(&str) + Send>;

/// Common surface of the chunked decoders
pub trait StreamDecoder {
    /// Feed the next chunk and return the output it produced.
    fn process(&mut self, chunk: &str) -> String;

    /// Finish the stream: release held-back text and reset. Tags still open are
    /// abandoned without firing their end callbacks.
    fn end(&mut self) -> String;

    /// Drain the tool calls closed so far.
    fn take_completed(&mut self) -> Vec<ToolCallSnapshot>;
}

pub struct TagStreamDecoder {
    vocabulary: Arc<ToolVocabulary>,
    renderers: Arc<RendererTable>,
    max_tag_len: usize,
    state: DecoderState,
    /// Text run not yet dispatched
    text: String,
    output: String,
    completed: Vec<ToolCallSnapshot>,
    json_updates: Vec<JsonParamUpdate>,
    sink: Option<Sink>,
}

impl TagStreamDecoder {
    pub fn new(vocabulary: Arc<ToolVocabulary>, renderers: Arc<RendererTable>) -> Self {
        Self {
            vocabulary,
            renderers,
            max_tag_len: DEFAULT_MAX_TAG_LEN,
            state: DecoderState::new(),
            text: String::new(),
            output: String::new(),
            completed: Vec::new(),
            json_updates: Vec::new(),
            sink: None,
        }
    }

    pub fn with_max_tag_len(mut self, max_tag_len: usize) -> Self {
        self.max_tag_len = max_tag_len.max(2);
        self
    }

    /// Push output to `sink` in addition to returning it.
    pub fn with_sink(mut self, sink: impl FnMut(&str) + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    /// The tool call currently open, with its open parameter marked incomplete
    pub fn snapshot(&self) -> Option<ToolCallSnapshot> {
        let tool = self.state.current_tool()?;
        let mut params: Vec<ParamSnapshot> = self
            .state
            .tool_params
            .iter()
            .map(|(name, value)| ParamSnapshot {
                name: name.to_string(),
                value: value.to_string(),
                complete: true,
            })
            .collect();
        if let Some(param) = self.state.current_param() {
            params.push(ParamSnapshot {
                name: param.to_string(),
                value: self.state.param_accumulator.clone(),
                complete: false,
            });
        }
        Some(ToolCallSnapshot {
            name: tool.to_string(),
            attributes: self.state.attributes.clone(),
            params,
            complete: false,
        })
    }

    /// Drain the JSON deltas produced for JSON parameters so far.
    pub fn take_json_updates(&mut self) -> Vec<JsonParamUpdate> {
        std::mem::take(&mut self.json_updates)
    }

    fn tag_context(&self) -> TagContext<'_> {
        match &self.state.state {
            ParserState::Outside => TagContext::new(NameSet::Only(self.vocabulary.names()), None),
            ParserState::InTool { tool } => {
                let open = match self.vocabulary.get(tool) {
                    Some(spec) if !spec.accepts_any_param() => NameSet::Only(&spec.params),
                    _ => NameSet::Any,
                };
                TagContext::new(open, Some(tool.as_str()))
            }
            ParserState::InParam { param, .. } => TagContext::new(NameSet::Nothing, Some(param.as_str())),
        }
    }

    fn push_char(&mut self, c: char) {
        if self.state.pending.is_empty() {
            if c == '<' {
                self.state.pending.push(c);
            } else {
                self.text.push(c);
            }
            return;
        }

        self.state.pending.push(c);
        let verdict = scan(&self.state.pending, &self.tag_context(), self.max_tag_len);
        match verdict {
            TagScan::NeedMore => {}
            TagScan::Literal => {
                let mut literal = std::mem::take(&mut self.state.pending);
                // A `<` that broke the token may itself start the next tag.
                let restart = literal.len() > 1 && literal.ends_with('<');
                if restart {
                    literal.pop();
                }
                if literal.len() > 2 {
                    crate::log_debug!("Not a tag here, keeping as text: {:?}", literal);
                }
                self.text.push_str(&literal);
                if restart {
                    self.state.pending.push('<');
                }
            }
            TagScan::Open { name, attributes } => {
                self.state.pending.clear();
                self.flush_text();
                self.open_tag(name, attributes);
            }
            TagScan::Close { .. } => {
                self.state.pending.clear();
                self.flush_text();
                self.close_tag();
            }
        }
    }

    fn emit(&mut self, fragment: Option<String>) {
        if let Some(fragment) = fragment {
            self.output.push_str(&fragment);
        }
    }

    fn open_tag(&mut self, name: String, attributes: Attributes) {
        let tool = match &self.state.state {
            ParserState::Outside => None,
            ParserState::InTool { tool } => Some(tool.clone()),
            ParserState::InParam { .. } => return,
        };
        match tool {
            None => {
                crate::log_debug!("Tool <{}> opened", name);
                let out = self.renderers.tool_start(&name, &attributes);
                self.state.open_tool(name, attributes);
                self.emit(out);
            }
            Some(tool) => {
                let out = self.renderers.param_start(&name, &tool);
                self.state.open_param(name);
                self.emit(out);
            }
        }
    }

    fn close_tag(&mut self) {
        match &self.state.state {
            ParserState::Outside => {}
            ParserState::InParam { tool, .. } => {
                let tool = tool.clone();
                if let Some((param, value)) = self.state.close_param() {
                    let out = self.renderers.param_end(&param, &tool, &value);
                    self.emit(out);
                }
            }
            ParserState::InTool { .. } => {
                if let Some((tool, attributes, params)) = self.state.close_tool() {
                    crate::log_debug!("Tool <{}> closed with {} param(s)", tool, params.len());
                    let out = self.renderers.tool_end(&tool, &params);
                    self.emit(out);
                    self.completed
                        .push(ToolCallSnapshot::finished(tool, attributes, &params));
                }
            }
        }
    }

    /// Dispatch the pending text run according to the current depth.
    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let (tool, param) = match &self.state.state {
            ParserState::Outside => {
                if let Some(out) = self.renderers.plain_text(&text) {
                    self.output.push_str(&out);
                }
                return;
            }
            ParserState::InTool { .. } => {
                self.output.push_str(&text);
                return;
            }
            ParserState::InParam { tool, param } => (tool.clone(), param.clone()),
        };

        self.state.param_accumulator.push_str(&text);
        let out = self.renderers.param_chunk(&text, &param, &tool);
        self.emit(out);
        if self.param_kind(&tool, &param) == ParamKind::Json {
            self.update_json(&tool, &param);
        }
    }

    fn param_kind(&self, tool: &str, param: &str) -> ParamKind {
        self.vocabulary
            .get(tool)
            .map_or(ParamKind::Text, |spec| spec.kind(param))
    }

    fn update_json(&mut self, tool: &str, param: &str) {
        let (update, parsed) = delta_from(&self.state.json_previous, &self.state.param_accumulator);
        self.state.json_previous = parsed;
        if update.is_empty() && !update.last_param.complete {
            return;
        }
        let out = self.renderers.json_delta(&update, param, tool);
        self.emit(out);
        self.json_updates.push(JsonParamUpdate {
            tool: tool.to_string(),
            param: param.to_string(),
            update,
        });
    }

    fn drain_output(&mut self) -> String {
        let out = std::mem::take(&mut self.output);
        if !out.is_empty() {
            if let Some(sink) = self.sink.as_mut() {
                sink(&out);
            }
        }
        out
    }
}

impl StreamDecoder for TagStreamDecoder {
    fn process(&mut self, chunk: &str) -> String {
        for c in chunk.chars() {
            self.push_char(c);
        }
        self.flush_text();
        self.drain_output()
    }

    fn end(&mut self) -> String {
        let pending = std::mem::take(&mut self.state.pending);
        self.text.push_str(&pending);
        self.flush_text();
        if let Some(tool) = self.state.current_tool() {
            match self.state.current_param() {
                Some(param) => crate::log_warn!(
                    "Stream ended inside <{}><{}>, dropping the partial tool call",
                    tool,
                    param
                ),
                None => crate::log_warn!(
                    "Stream ended inside <{}>, dropping the partial tool call",
                    tool
                ),
            }
        }
        self.state.reset();
        self.drain_output()
    }

    fn take_completed(&mut self) -> Vec<ToolCallSnapshot> {
        std::mem::take(&mut self.completed)
    }
}
