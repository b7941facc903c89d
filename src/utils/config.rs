// src/utils/config.rs
use crate::core::decoder::DEFAULT_MAX_TAG_LEN;
use crate::error::{Result, StreamError};
use crate::tools::helpers::Theme;
use crate::tools::{ToolSpec, ToolVocabulary};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// JSON-bodied envelope settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Tag wrapping each call, e.g. `tool_call`
    pub tag: String,
    /// Key carrying the tool name
    pub name_key: String,
    /// Keys that are never rendered or stored as parameters
    pub ignored_keys: Vec<String>,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            tag: "tool_call".to_string(),
            name_key: "tool_name".to_string(),
            ignored_keys: vec!["ends_agent_step".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub color: bool,
    pub max_tag_len: usize,
    /// Merged over the built-in vocabulary, replacing tools of the same name
    pub tools: Vec<ToolSpec>,
    pub envelope: EnvelopeConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            color: true,
            max_tag_len: DEFAULT_MAX_TAG_LEN,
            tools: Vec::new(),
            envelope: EnvelopeConfig::default(),
        }
    }
}

impl StreamConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: StreamConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        crate::log_info!(
            "Loaded stream config from {} ({} extra tool(s))",
            path.display(),
            config.tools.len()
        );
        Ok(config)
    }

    /// Apply environment overrides (`NO_COLOR`).
    pub fn with_env(mut self) -> Self {
        if std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            self.color = false;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tag_len < 2 {
            return Err(StreamError::Config(format!(
                "max_tag_len must be at least 2, got {}",
                self.max_tag_len
            )));
        }
        if self.envelope.tag.is_empty() || self.envelope.name_key.is_empty() {
            return Err(StreamError::Config(
                "envelope tag and name_key must not be empty".to_string(),
            ));
        }
        if let Some(spec) = self.tools.iter().find(|t| t.name.is_empty()) {
            return Err(StreamError::Config(format!(
                "tool entry with empty name (params: {:?})",
                spec.params
            )));
        }
        Ok(())
    }

    pub fn theme(&self) -> Theme {
        Theme { color: self.color }
    }

    /// Built-in vocabulary with this config's tools merged in
    pub fn vocabulary(&self) -> Arc<ToolVocabulary> {
        if self.tools.is_empty() {
            return ToolVocabulary::shared();
        }
        let mut vocabulary = ToolVocabulary::builtin();
        vocabulary.extend(self.tools.iter().cloned());
        Arc::new(vocabulary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: StreamConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, StreamConfig::default());
        assert_eq!(config.max_tag_len, 256);
        assert_eq!(config.envelope.tag, "tool_call");
        assert_eq!(config.envelope.ignored_keys, vec!["ends_agent_step"]);
    }

    #[test]
    fn test_partial_config() {
        let config: StreamConfig = serde_json::from_str(
            r#"{"color": false, "tools": [{"name": "deploy", "params": ["target"]}], "envelope": {"tag": "call"}}"#,
        )
        .unwrap();
        assert!(!config.color);
        assert_eq!(config.envelope.tag, "call");
        assert_eq!(config.envelope.name_key, "tool_name");
        let vocab = config.vocabulary();
        assert!(vocab.contains("deploy"));
        assert!(vocab.contains("write_file"));
        assert!(!config.theme().color);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = StreamConfig {
            max_tag_len: 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StreamError::Config(_))));

        let mut config = StreamConfig::default();
        config.envelope.name_key.clear();
        assert!(config.validate().is_err());

        let config = StreamConfig {
            tools: vec![ToolSpec::new("")],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_errors() {
        assert!(matches!(
            StreamConfig::from_file("/nonexistent/toolstream.json"),
            Err(StreamError::Io(_))
        ));

        let path = std::env::temp_dir().join(format!("toolstream_cfg_{}.json", std::process::id()));
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(StreamConfig::from_file(&path), Err(StreamError::Json(_))));
        std::fs::write(&path, r#"{"max_tag_len": 64}"#).unwrap();
        assert_eq!(StreamConfig::from_file(&path).unwrap().max_tag_len, 64);
        let _ = std::fs::remove_file(&path);
    }
}
