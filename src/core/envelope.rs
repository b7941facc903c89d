// src/core/envelope.rs
//! Decoder for tool calls sent as a single envelope tag with a JSON body:
//!
//! ```text
//! <tool_call>{"tool_name": "write_file", "path": "a.ts", "content": "..."}</tool_call>
//! ```
//!
//! The body is diffed with the delta engine as it grows and the resulting key
//! events drive the same renderer callbacks as [`super::TagStreamDecoder`].

use super::decoder::{Sink, StreamDecoder, DEFAULT_MAX_TAG_LEN};
use super::state::ToolParams;
use super::tag::{scan, Attributes, NameSet, TagContext, TagScan};
use crate::json::{delta_from, DeltaResult, PartialParseResult};
use crate::tools::{RendererTable, ToolCallSnapshot};
use crate::utils::config::EnvelopeConfig;
use serde_json::Value;
use std::sync::Arc;

/// Progress of the envelope currently open
#[derive(Debug, Default)]
struct EnvelopeCall {
    body: String,
    /// Reconstruction of `body` as of the last flush
    parsed: PartialParseResult,
    tool: Option<String>,
    current_param: Option<String>,
    finished_params: Vec<String>,
    /// Latest values, non-strings as compact JSON
    params: ToolParams,
}

pub struct EnvelopeDecoder {
    config: EnvelopeConfig,
    renderers: Arc<RendererTable>,
    max_tag_len: usize,
    tag_names: Vec<String>,
    pending: String,
    text: String,
    output: String,
    in_envelope: bool,
    call: EnvelopeCall,
    completed: Vec<ToolCallSnapshot>,
    sink: Option<Sink>,
}

/// Value as parameter text
fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl EnvelopeDecoder {
    pub fn new(config: EnvelopeConfig, renderers: Arc<RendererTable>) -> Self {
        let tag_names = vec![config.tag.clone()];
        Self {
            config,
            renderers,
            max_tag_len: DEFAULT_MAX_TAG_LEN,
            tag_names,
            pending: String::new(),
            text: String::new(),
            output: String::new(),
            in_envelope: false,
            call: EnvelopeCall::default(),
            completed: Vec::new(),
            sink: None,
        }
    }

    pub fn with_max_tag_len(mut self, max_tag_len: usize) -> Self {
        self.max_tag_len = max_tag_len.max(2);
        self
    }

    pub fn with_sink(mut self, sink: impl FnMut(&str) + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn in_envelope(&self) -> bool {
        self.in_envelope
    }

    fn push_char(&mut self, c: char) {
        if self.pending.is_empty() {
            if c == '<' {
                self.pending.push(c);
            } else {
                self.text.push(c);
            }
            return;
        }

        self.pending.push(c);
        let ctx = if self.in_envelope {
            TagContext::new(NameSet::Nothing, Some(self.config.tag.as_str()))
        } else {
            TagContext::new(NameSet::Only(&self.tag_names), None)
        };
        match scan(&self.pending, &ctx, self.max_tag_len) {
            TagScan::NeedMore => {}
            TagScan::Literal => {
                let mut literal = std::mem::take(&mut self.pending);
                let restart = literal.len() > 1 && literal.ends_with('<');
                if restart {
                    literal.pop();
                }
                self.text.push_str(&literal);
                if restart {
                    self.pending.push('<');
                }
            }
            TagScan::Open { .. } => {
                self.pending.clear();
                self.flush_text();
                self.in_envelope = true;
                self.call = EnvelopeCall::default();
            }
            TagScan::Close { .. } => {
                self.pending.clear();
                self.flush_text();
                self.close_envelope();
            }
        }
    }

    fn emit(&mut self, fragment: Option<String>) {
        if let Some(fragment) = fragment {
            self.output.push_str(&fragment);
        }
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        if !self.in_envelope {
            let out = self.renderers.plain_text(&text);
            self.emit(out);
            return;
        }

        self.call.body.push_str(&text);
        let (update, parsed) = delta_from(&self.call.parsed, &self.call.body);
        self.call.parsed = parsed;
        self.apply(update);
    }

    fn is_ignored(&self, key: &str) -> bool {
        self.config.ignored_keys.iter().any(|k| k == key)
    }

    fn apply(&mut self, update: DeltaResult) {
        let DeltaResult {
            delta,
            result,
            last_param,
        } = update;
        let is_last = |key: &str| last_param.key.as_deref() == Some(key);

        for (key, value) in delta {
            if key == self.config.name_key {
                if (is_last(&key) && !last_param.complete) || self.call.tool.is_some() {
                    continue;
                }
                let Some(name) = result.get(&key).and_then(Value::as_str) else {
                    crate::log_debug!("Envelope '{}' is not a string", key);
                    continue;
                };
                let out = self.renderers.tool_start(name, &Attributes::new());
                self.call.tool = Some(name.to_string());
                self.emit(out);
                continue;
            }
            if self.is_ignored(&key) {
                continue;
            }
            let Some(tool) = self.call.tool.clone() else {
                crate::log_debug!("Envelope key '{}' arrived before the tool name", key);
                continue;
            };

            if let Some(current) = self.call.current_param.take() {
                if current == key {
                    self.call.current_param = Some(current);
                } else {
                    let full = stringify(result.get(&current));
                    let out = self.renderers.param_end(&current, &tool, &full);
                    self.emit(out);
                    self.call.finished_params.push(current);
                }
            }
            if self.call.finished_params.contains(&key) {
                continue;
            }

            if !self.call.params.contains(&key) {
                let out = self.renderers.param_start(&key, &tool);
                self.emit(out);
            }
            self.call.current_param = Some(key.clone());

            let chunk = stringify(Some(&value));
            if !chunk.is_empty() {
                let out = self.renderers.param_chunk(&chunk, &key, &tool);
                self.emit(out);
            }

            if is_last(&key) && last_param.complete {
                let full = stringify(result.get(&key));
                let out = self.renderers.param_end(&key, &tool, &full);
                self.emit(out);
                self.call.current_param = None;
                self.call.finished_params.push(key);
            }
        }

        self.call.params = result
            .iter()
            .filter(|(k, _)| **k != self.config.name_key && !self.is_ignored(k))
            .map(|(k, v)| (k.as_str(), stringify(Some(v))))
            .collect();
    }

    fn close_envelope(&mut self) {
        self.in_envelope = false;
        let call = std::mem::take(&mut self.call);
        let Some(tool) = call.tool else {
            crate::log_warn!(
                "Envelope closed without a tool name, dropping {} byte body",
                call.body.len()
            );
            return;
        };
        if let Some(current) = &call.current_param {
            let out = self
                .renderers
                .param_end(current, &tool, call.params.get(current).unwrap_or_default());
            self.emit(out);
        }
        let out = self.renderers.tool_end(&tool, &call.params);
        self.emit(out);
        crate::log_debug!("Envelope call <{}> closed", tool);
        self.completed
            .push(ToolCallSnapshot::finished(tool, Attributes::new(), &call.params));
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

impl StreamDecoder for EnvelopeDecoder {
    fn process(&mut self, chunk: &str) -> String {
        for c in chunk.chars() {
            self.push_char(c);
        }
        self.flush_text();
        self.drain_output()
    }

    fn end(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        self.text.push_str(&pending);
        self.flush_text();
        if self.in_envelope {
            crate::log_warn!(
                "Stream ended inside <{}> ({:?}), dropping the partial tool call",
                self.config.tag,
                self.call.tool
            );
        }
        self.in_envelope = false;
        self.call = EnvelopeCall::default();
        self.drain_output()
    }

    fn take_completed(&mut self) -> Vec<ToolCallSnapshot> {
        std::mem::take(&mut self.completed)
    }
}
