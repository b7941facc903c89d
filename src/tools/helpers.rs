// src/tools/helpers.rs
//! Helper functions for tool call rendering and logging.

use super::ToolCallSnapshot;
use colored::Colorize;

/// `write_file` -> `Write File`
pub fn snake_to_title_case(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-case the first character
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Terminal styling used by renderers. With `color` off every helper returns
/// its input unchanged.
///
/// Colored output wraps each fragment in its own escape codes, so the rendered
/// bytes depend on chunk boundaries even though the visible text does not.
/// Only the plain theme gives byte-identical output for any chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub color: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Theme {
    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn gray(&self, text: &str) -> String {
        if self.color {
            text.bright_black().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// Blank line, then `[Title]` on its own line
    pub fn header(&self, title: &str) -> String {
        format!("\n\n{}\n", self.gray(&format!("[{}]", self.bold(title))))
    }
}

/// Format tool calls for logging - returns a summary string
pub fn format_tool_calls_summary(tool_calls: &[ToolCallSnapshot]) -> String {
    if tool_calls.is_empty() {
        return String::new();
    }
    tool_calls
        .iter()
        .map(|call| {
            let args = call
                .params
                .iter()
                .map(|p| {
                    let value = p.value.replace('\n', " ");
                    let value = if value.chars().count() > 160 {
                        let snippet: String = value.chars().take(160).collect();
                        format!("{}...", snippet)
                    } else {
                        value
                    };
                    format!("{}={}", p.name, value)
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", call.name, args)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Log tool calls with a label (uses crate logging)
pub fn log_tool_calls(label: &str, tool_calls: &[ToolCallSnapshot]) {
    if tool_calls.is_empty() {
        return;
    }
    let summary = format_tool_calls_summary(tool_calls);
    crate::log_info!("{} tool call(s): {}", label, summary);
}
