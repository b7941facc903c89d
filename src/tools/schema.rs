// src/tools/schema.rs
//! Closed tool vocabulary
//!
//! The decoder only reacts to tool tags listed here, and inside a tool only to
//! that tool's parameter tags. Everything else is text.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

static BUILTIN: Lazy<Arc<ToolVocabulary>> = Lazy::new(|| Arc::new(ToolVocabulary::builtin()));

/// How a parameter's body is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Opaque text
    #[default]
    Text,
    /// A streamed JSON value; also diffed through the delta engine
    Json,
}

/// One tool and its parameter tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    /// Accepted parameter names. Empty accepts any parameter name.
    #[serde(default)]
    pub params: Vec<String>,
    /// Subset of `params` carrying JSON
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub json_params: Vec<String>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            json_params: Vec::new(),
        }
    }

    /// Add a text parameter
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    /// Add a JSON parameter
    pub fn json_param(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.params.push(name.clone());
        self.json_params.push(name);
        self
    }

    pub fn accepts_any_param(&self) -> bool {
        self.params.is_empty()
    }

    pub fn kind(&self, param: &str) -> ParamKind {
        if self.json_params.iter().any(|p| p == param) {
            ParamKind::Json
        } else {
            ParamKind::Text
        }
    }
}

/// Set of known tools, looked up by exact name
#[derive(Debug, Clone, Default)]
pub struct ToolVocabulary {
    tools: Vec<ToolSpec>,
    names: Vec<String>,
}

impl ToolVocabulary {
    pub fn new(tools: impl IntoIterator<Item = ToolSpec>) -> Self {
        let mut vocabulary = Self::default();
        vocabulary.extend(tools);
        vocabulary
    }

    /// Agent tool set understood out of the box
    pub fn builtin() -> Self {
        Self::new([
            ToolSpec::new("add_message").param("role").param("content"),
            ToolSpec::new("add_subgoal")
                .param("id")
                .param("objective")
                .param("status")
                .param("plan")
                .param("log"),
            ToolSpec::new("browser_logs")
                .param("type")
                .param("url")
                .param("waitUntil"),
            ToolSpec::new("code_search")
                .param("pattern")
                .param("flags")
                .param("cwd"),
            ToolSpec::new("create_plan").param("path").param("plan"),
            ToolSpec::new("end_turn"),
            ToolSpec::new("find_files").param("prompt"),
            ToolSpec::new("read_docs")
                .param("libraryTitle")
                .param("topic")
                .param("max_tokens"),
            ToolSpec::new("read_files").json_param("paths"),
            ToolSpec::new("run_file_change_hooks").json_param("files"),
            ToolSpec::new("run_terminal_command")
                .param("command")
                .param("process_type")
                .param("cwd")
                .param("timeout_seconds"),
            ToolSpec::new("send_agent_message")
                .param("target_agent_id")
                .param("prompt")
                .json_param("params"),
            ToolSpec::new("set_messages").json_param("messages"),
            ToolSpec::new("set_output"),
            ToolSpec::new("spawn_agents").json_param("agents"),
            ToolSpec::new("spawn_agents_async").json_param("agents"),
            ToolSpec::new("str_replace")
                .param("path")
                .json_param("replacements"),
            ToolSpec::new("think_deeply").param("thought"),
            ToolSpec::new("update_report").json_param("json_update"),
            ToolSpec::new("update_subgoal")
                .param("id")
                .param("status")
                .param("plan")
                .param("log"),
            ToolSpec::new("web_search").param("query").param("depth"),
            ToolSpec::new("write_file")
                .param("path")
                .param("instructions")
                .param("content"),
        ])
    }

    /// Process-wide copy of [`ToolVocabulary::builtin`] for decoders that
    /// need nothing else.
    pub fn shared() -> Arc<ToolVocabulary> {
        Arc::clone(&BUILTIN)
    }

    /// Add tools, replacing any existing tool of the same name.
    pub fn extend(&mut self, tools: impl IntoIterator<Item = ToolSpec>) {
        for spec in tools {
            match self.tools.iter_mut().find(|t| t.name == spec.name) {
                Some(existing) => *existing = spec,
                None => {
                    self.names.push(spec.name.clone());
                    self.tools.push(spec);
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let vocab = ToolVocabulary::builtin();
        let write_file = vocab.get("write_file").unwrap();
        assert_eq!(write_file.params, vec!["path", "instructions", "content"]);
        assert_eq!(write_file.kind("content"), ParamKind::Text);
        assert_eq!(vocab.get("read_files").unwrap().kind("paths"), ParamKind::Json);
        assert!(vocab.get("set_output").unwrap().accepts_any_param());
        assert!(!vocab.contains("write"));
        assert_eq!(vocab.names().len(), vocab.len());

        let shared = ToolVocabulary::shared();
        assert!(Arc::ptr_eq(&shared, &ToolVocabulary::shared()));
        assert_eq!(shared.names(), vocab.names());
    }

    #[test]
    fn test_extend_replaces_by_name() {
        let mut vocab = ToolVocabulary::builtin();
        let before = vocab.len();
        vocab.extend([
            ToolSpec::new("write_file").param("path"),
            ToolSpec::new("deploy").param("target"),
        ]);
        assert_eq!(vocab.len(), before + 1);
        assert_eq!(vocab.get("write_file").unwrap().params, vec!["path"]);
        assert!(vocab.names().iter().any(|n| n == "deploy"));
    }

    #[test]
    fn test_spec_from_config_json() {
        let spec: ToolSpec =
            serde_json::from_str(r#"{"name": "deploy", "params": ["target", "env"], "json_params": ["env"]}"#)
                .unwrap();
        assert_eq!(spec.kind("env"), ParamKind::Json);
        assert_eq!(spec.kind("target"), ParamKind::Text);

        let bare: ToolSpec = serde_json::from_str(r#"{"name": "ping"}"#).unwrap();
        assert!(bare.accepts_any_param());
    }
}
