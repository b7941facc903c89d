// src/utils/logger.rs
//! Per-session transcript logger.
//! Enable by setting environment variable TOOLSTREAM_LOGGER=true
//!
//! Writes raw chunks, rendered output and completed tool calls of one decoding
//! session to `log/toolstream_<secs>_<millis>.log`. File errors are ignored.

use crate::tools::ToolCallSnapshot;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LOGGER_ENV: &str = "TOOLSTREAM_LOGGER";

/// Check if transcript logging is enabled via environment variable
pub fn is_logging_enabled() -> bool {
    std::env::var(LOGGER_ENV)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

pub struct SessionLogger {
    file_path: PathBuf,
}

impl SessionLogger {
    /// Returns None if logging is disabled.
    pub fn new() -> Option<Self> {
        if !is_logging_enabled() {
            return None;
        }
        Some(Self::in_dir("log"))
    }

    /// Logger writing into `dir` regardless of the environment
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let log_dir = dir.as_ref();
        if !log_dir.exists() {
            let _ = fs::create_dir_all(log_dir);
        }

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        let file_path = log_dir.join(format!(
            "toolstream_{}_{:03}.log",
            now.as_secs(),
            now.subsec_millis()
        ));
        crate::log_info!("Session logging enabled, writing to: {}", file_path.display());
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn write(&self, content: &str) {
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
        {
            let _ = file.write_all(content.as_bytes());
        }
    }

    pub fn log_chunk(&self, chunk: &str) {
        self.write(&format!("=== CHUNK ({} bytes) ===\n{}\n", chunk.len(), chunk));
    }

    pub fn log_output(&self, output: &str) {
        if output.is_empty() {
            return;
        }
        self.write(&format!("=== OUTPUT ===\n{}\n", output));
    }

    pub fn log_tool_calls(&self, tool_calls: &[ToolCallSnapshot]) {
        if tool_calls.is_empty() {
            return;
        }
        if let Ok(json) = serde_json::to_string_pretty(tool_calls) {
            self.write(&format!(
                "\n=== TOOL CALLS ({}) ===\n{}\n",
                tool_calls.len(),
                json
            ));
        }
    }

    pub fn log_error(&self, error: &str) {
        self.write(&format!("\n=== ERROR ===\n{}\n", error));
    }
}
