// src/tools/renderers.rs
//! Built-in renderers for the agent tool set.

use super::helpers::{capitalize, Theme};
use super::renderer::{RendererEntry, RendererTable};
use serde::Deserialize;

const MAX_LISTED_FILES: usize = 3;

const SILENT_TOOLS: &[&str] = &[
    "end_turn",
    "browser_logs",
    "run_file_change_hooks",
    "add_message",
    "set_messages",
];

/// Renderer table covering the built-in vocabulary. Tools without an entry
/// (`run_terminal_command`, `code_search`, ...) use the default rendering.
pub fn builtin_table(theme: Theme) -> RendererTable {
    let mut table = RendererTable::new(theme);
    for tool in SILENT_TOOLS {
        table.insert(*tool, RendererEntry::silent());
    }
    table
        .with_entry("read_files", read_files(theme))
        .with_entry("web_search", web_search(theme))
        .with_entry("create_plan", create_plan(theme))
        .with_entry("write_file", write_file(theme))
        .with_entry("str_replace", str_replace(theme))
        .with_entry("add_subgoal", subgoal(theme, &["objective", "status"]))
        .with_entry("update_subgoal", subgoal(theme, &["status"]))
        .with_entry("spawn_agents", spawn_agents(theme))
        .with_entry("spawn_agents_async", spawn_agents(theme))
        .with_entry("send_agent_message", send_agent_message(theme))
        .with_entry("set_output", set_output(theme))
}

/// Accepts a JSON array of strings, or one path per line.
fn parse_file_list(content: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(content.trim()) {
        Ok(files) => files,
        Err(_) => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn format_file_list(files: &[String]) -> String {
    if files.len() <= MAX_LISTED_FILES {
        return files.join("\n");
    }
    let (shown, rest) = files.split_at(MAX_LISTED_FILES);
    let listed = shown
        .iter()
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{listed}\nand {} more: {}", rest.len(), rest.join(" "))
}

fn read_files(theme: Theme) -> RendererEntry {
    RendererEntry::new()
        .on_param_chunk(|_, _, _| None)
        .on_param_end(move |_, _, content| {
            let files = parse_file_list(content);
            if files.is_empty() {
                crate::log_debug!("read_files: no paths in {:?}", content);
                return None;
            }
            Some(theme.gray(&format_file_list(&files)))
        })
        .on_tool_end(|_, _| Some("\n".to_string()))
}

fn web_search(theme: Theme) -> RendererEntry {
    RendererEntry::new()
        .on_param_chunk(|_, _, _| None)
        .on_param_end(move |param, _, content| (param == "query").then(|| theme.gray(content)))
}

fn create_plan(theme: Theme) -> RendererEntry {
    RendererEntry::new()
        .on_param_start(move |param, _| (param == "path").then(|| theme.gray("Editing plan at ")))
        .on_param_chunk(move |content, param, _| (param == "path").then(|| theme.gray(content)))
        .on_param_end(move |param, _, _| (param == "path").then(|| format!("{}\n", theme.gray("..."))))
}

fn write_file(theme: Theme) -> RendererEntry {
    RendererEntry::new()
        .on_param_start(move |param, _| (param == "path").then(|| theme.gray("Editing file at ")))
        .on_param_chunk(|_, _, _| None)
        .on_param_end(move |param, _, content| match param {
            "path" => Some(theme.gray(&format!("{content}..."))),
            "instructions" => Some(theme.gray(&format!("\n{content}"))),
            _ => None,
        })
}

fn str_replace(theme: Theme) -> RendererEntry {
    RendererEntry::new()
        .on_tool_start(move |_, _| Some(theme.header("Edit File")))
        .on_param_start(move |param, _| (param == "path").then(|| theme.gray("Editing file at ")))
        .on_param_chunk(move |content, param, _| (param == "path").then(|| theme.gray(content)))
        .on_param_end(move |param, _, _| (param == "path").then(|| format!("{}\n", theme.gray("..."))))
}

fn subgoal(theme: Theme, newline_after: &'static [&'static str]) -> RendererEntry {
    RendererEntry::new()
        .on_param_start(move |param, _| {
            (param != "id").then(|| theme.gray(&format!("{}: ", capitalize(param))))
        })
        .on_param_chunk(move |content, param, _| (param != "id").then(|| theme.gray(content)))
        .on_param_end(move |param, _, _| {
            newline_after
                .iter()
                .any(|p| *p == param)
                .then(|| "\n".to_string())
        })
}

#[derive(Debug, Deserialize)]
struct AgentSpawn {
    agent_type: Option<String>,
    prompt: Option<String>,
}

fn format_agents(content: &str, theme: Theme) -> Option<String> {
    let agents: Vec<AgentSpawn> = match serde_json::from_str(content.trim()) {
        Ok(agents) => agents,
        Err(e) => {
            crate::log_debug!("spawn_agents: unreadable agents payload: {}", e);
            return None;
        }
    };
    let blocks: Vec<String> = agents
        .into_iter()
        .filter_map(|agent| {
            let agent_type = agent.agent_type.filter(|t| !t.is_empty())?;
            let prompt = agent
                .prompt
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| "No prompt provided".to_string());
            Some(format!("@{}:\n{}", theme.bold(&agent_type), prompt))
        })
        .collect();
    if blocks.is_empty() {
        return None;
    }
    Some(theme.gray(&format!("{}\n", blocks.join("\n\n"))))
}

fn spawn_agents(theme: Theme) -> RendererEntry {
    RendererEntry::new()
        .on_tool_start(move |_, _| Some(theme.header("Spawn Agents")))
        .on_param_chunk(|_, _, _| None)
        .on_param_end(move |param, _, content| {
            if param != "agents" {
                return None;
            }
            format_agents(content, theme)
        })
        .on_tool_end(|_, _| Some("\n".to_string()))
}

fn send_agent_message(theme: Theme) -> RendererEntry {
    RendererEntry::new()
        .on_param_chunk(move |content, param, _| (param == "prompt").then(|| theme.gray(content)))
}

fn set_output(theme: Theme) -> RendererEntry {
    RendererEntry::new()
        .on_tool_start(move |_, _| Some(format!("{}...\n", theme.header("Set Output"))))
        .on_param_chunk(|_, _, _| None)
        .on_tool_end(|_, _| Some("\n".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tag::Attributes;
    use crate::core::ToolParams;

    fn table() -> RendererTable {
        builtin_table(Theme::plain())
    }

    #[test]
    fn test_silent_tools() {
        let table = table();
        for tool in SILENT_TOOLS {
            assert_eq!(table.tool_start(tool, &Attributes::new()), None);
            assert_eq!(table.param_chunk("x", "files", tool), None);
            assert_eq!(table.tool_end(tool, &ToolParams::new()), None);
        }
    }

    #[test]
    fn test_default_tools_stream_params() {
        let table = table();
        assert_eq!(
            table.tool_start("code_search", &Attributes::new()),
            Some("\n\n[Code Search]\n".to_string())
        );
        assert_eq!(
            table.param_chunk("fn main", "pattern", "code_search"),
            Some("fn main".to_string())
        );
    }

    #[test]
    fn test_read_files_listing() {
        let table = table();
        assert_eq!(table.param_chunk("[\"a", "paths", "read_files"), None);
        assert_eq!(
            table.param_end("paths", "read_files", r#"["a.rs", "b.rs"]"#),
            Some("a.rs\nb.rs".to_string())
        );
        assert_eq!(
            table.param_end("paths", "read_files", r#"["a", "b", "c", "d", "e"]"#),
            Some("- a\n- b\n- c\nand 2 more: d e".to_string())
        );
        assert_eq!(
            table.param_end("paths", "read_files", "\nsrc/x.rs\nsrc/y.rs\n"),
            Some("src/x.rs\nsrc/y.rs".to_string())
        );
        assert_eq!(table.param_end("paths", "read_files", "  "), None);
        assert_eq!(
            table.tool_end("read_files", &ToolParams::new()),
            Some("\n".to_string())
        );
    }

    #[test]
    fn test_write_file_shows_path_only() {
        let table = table();
        assert_eq!(
            table.param_start("path", "write_file"),
            Some("Editing file at ".to_string())
        );
        assert_eq!(table.param_start("content", "write_file"), None);
        assert_eq!(table.param_chunk("code", "content", "write_file"), None);
        assert_eq!(
            table.param_end("path", "write_file", "test.ts"),
            Some("test.ts...".to_string())
        );
        assert_eq!(
            table.param_end("instructions", "write_file", "add logging"),
            Some("\nadd logging".to_string())
        );
        assert_eq!(table.param_end("content", "write_file", "code"), None);
    }

    #[test]
    fn test_str_replace_header_and_path() {
        let table = table();
        assert_eq!(
            table.tool_start("str_replace", &Attributes::new()),
            Some("\n\n[Edit File]\n".to_string())
        );
        assert_eq!(
            table.param_chunk("src/", "path", "str_replace"),
            Some("src/".to_string())
        );
        assert_eq!(table.param_chunk("[", "replacements", "str_replace"), None);
        assert_eq!(
            table.param_end("path", "str_replace", "src/a.rs"),
            Some("...\n".to_string())
        );
    }

    #[test]
    fn test_subgoal_lines() {
        let table = table();
        assert_eq!(table.param_start("id", "add_subgoal"), None);
        assert_eq!(table.param_chunk("1", "id", "add_subgoal"), None);
        assert_eq!(
            table.param_start("objective", "add_subgoal"),
            Some("Objective: ".to_string())
        );
        assert_eq!(
            table.param_end("objective", "add_subgoal", "x"),
            Some("\n".to_string())
        );
        assert_eq!(table.param_end("objective", "update_subgoal", "x"), None);
        assert_eq!(
            table.param_end("status", "update_subgoal", "COMPLETE"),
            Some("\n".to_string())
        );
    }

    #[test]
    fn test_spawn_agents_blocks() {
        let table = table();
        let agents = r#"[{"agent_type": "researcher", "prompt": "find docs"}, {"prompt": "no type"}, {"agent_type": "reviewer"}]"#;
        assert_eq!(
            table.param_end("agents", "spawn_agents_async", agents),
            Some("@researcher:\nfind docs\n\n@reviewer:\nNo prompt provided\n".to_string())
        );
        assert_eq!(table.param_end("agents", "spawn_agents", "[not json"), None);
        assert_eq!(
            table.tool_start("spawn_agents", &Attributes::new()),
            Some("\n\n[Spawn Agents]\n".to_string())
        );
    }

    #[test]
    fn test_set_output_and_send_message() {
        let table = table();
        assert_eq!(
            table.tool_start("set_output", &Attributes::new()),
            Some("\n\n[Set Output]\n...\n".to_string())
        );
        assert_eq!(table.param_chunk("v", "summary", "set_output"), None);
        assert_eq!(
            table.param_chunk("hi", "prompt", "send_agent_message"),
            Some("hi".to_string())
        );
        assert_eq!(table.param_chunk("a1", "target_agent_id", "send_agent_message"), None);
    }
}
