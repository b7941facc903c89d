// src/core/tag.rs
//! Tag token recognition.
//!
//! The decoder buffers everything from a `<` onwards and asks [`scan`] after every
//! character whether the buffer is still a possible tag, a finished tag, or plain
//! text. Only names acceptable at the current nesting depth are recognized, and a
//! partially typed name keeps the buffer alive only while it is a prefix of one
//! of them, so ordinary prose such as `a < b` is released immediately.

use std::collections::BTreeMap;

/// Attributes of an opening tag; order is not significant
pub type Attributes = BTreeMap<String, String>;

/// Verdict on a buffered tag token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagScan {
    /// Still a viable tag, keep buffering
    NeedMore,
    /// Not a tag we react to; release the buffer as text
    Literal,
    Open { name: String, attributes: Attributes },
    Close { name: String },
}

/// Tag names that may open at the current depth
#[derive(Debug, Clone, Copy)]
pub enum NameSet<'a> {
    Nothing,
    /// Any well-formed name
    Any,
    Only(&'a [String]),
}

impl NameSet<'_> {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameSet::Nothing => false,
            NameSet::Any => true,
            NameSet::Only(names) => names.iter().any(|n| n == name),
        }
    }

    fn could_match(&self, prefix: &str) -> bool {
        match self {
            NameSet::Nothing => false,
            NameSet::Any => true,
            NameSet::Only(names) => names.iter().any(|n| n.starts_with(prefix)),
        }
    }
}

/// What the decoder will accept at its current depth
#[derive(Debug, Clone, Copy)]
pub struct TagContext<'a> {
    pub open: NameSet<'a>,
    /// Name of the innermost open element, the only one that may be closed
    pub close: Option<&'a str>,
}

impl<'a> TagContext<'a> {
    pub fn new(open: NameSet<'a>, close: Option<&'a str>) -> Self {
        Self { open, close }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.')
}

/// Classify `pending`, which starts with `<`.
pub fn scan(pending: &str, ctx: &TagContext<'_>, max_len: usize) -> TagScan {
    let verdict = match pending.strip_prefix('<') {
        None => TagScan::Literal,
        Some("") => TagScan::NeedMore,
        Some(rest) => match rest.strip_prefix('/') {
            Some(body) => scan_close(body, ctx.close),
            None => scan_open(rest, &ctx.open),
        },
    };
    if verdict == TagScan::NeedMore && pending.len() >= max_len {
        crate::log_debug!("Tag token exceeded {} bytes, treating as text", max_len);
        return TagScan::Literal;
    }
    verdict
}

/// Split a leading name off `body`. The second item is the remainder, starting
/// at the first non-name character, or `None` while the name may still grow.
fn split_name(body: &str) -> Option<(&str, Option<&str>)> {
    let first = body.chars().next()?;
    if !is_name_start(first) {
        return Some(("", Some(body)));
    }
    match body.char_indices().find(|(_, c)| !is_name_char(*c)) {
        Some((idx, _)) => Some((&body[..idx], Some(&body[idx..]))),
        None => Some((body, None)),
    }
}

fn scan_close(body: &str, expected: Option<&str>) -> TagScan {
    let Some(expected) = expected else {
        return TagScan::Literal;
    };
    let Some((name, rest)) = split_name(body) else {
        return TagScan::NeedMore;
    };
    if name.is_empty() {
        return TagScan::Literal;
    }
    let Some(rest) = rest else {
        return if expected.starts_with(name) {
            TagScan::NeedMore
        } else {
            TagScan::Literal
        };
    };
    if name != expected {
        return TagScan::Literal;
    }
    let tail = rest.trim_start();
    match tail.chars().next() {
        None => TagScan::NeedMore,
        Some('>') if tail.len() == 1 => TagScan::Close {
            name: name.to_string(),
        },
        Some(_) => TagScan::Literal,
    }
}

fn scan_open(body: &str, accepted: &NameSet<'_>) -> TagScan {
    let Some((name, rest)) = split_name(body) else {
        return TagScan::NeedMore;
    };
    if name.is_empty() {
        return TagScan::Literal;
    }
    let Some(rest) = rest else {
        return if accepted.could_match(name) {
            TagScan::NeedMore
        } else {
            TagScan::Literal
        };
    };
    if !accepted.matches(name) {
        return TagScan::Literal;
    }

    let Some(first) = rest.chars().next() else {
        return TagScan::NeedMore;
    };
    if first == '>' {
        return TagScan::Open {
            name: name.to_string(),
            attributes: Attributes::new(),
        };
    }
    if !first.is_whitespace() {
        return TagScan::Literal;
    }

    match attribute_section_end(rest) {
        None => TagScan::NeedMore,
        Some(end) => {
            let section = &rest[..end];
            if section.trim_end().ends_with('/') {
                // Self-closing syntax is not a tool call.
                return TagScan::Literal;
            }
            TagScan::Open {
                name: name.to_string(),
                attributes: parse_attributes(section),
            }
        }
    }
}

/// Byte offset of the `>` ending an attribute section; quoted `>` does not count.
fn attribute_section_end(section: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in section.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(idx),
            (None, _) => {}
        }
    }
    None
}

/// Parse `name="value"` pairs. Whitespace around `=` is tolerated; attributes
/// without a quoted value are skipped.
pub fn parse_attributes(input: &str) -> Attributes {
    let mut attributes = Attributes::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        let after_name = rest[name_end..].trim_start();

        let Some(after_eq) = after_name.strip_prefix('=') else {
            crate::log_debug!("Attribute '{}' has no value, skipped", name);
            rest = after_name;
            continue;
        };
        let value_part = after_eq.trim_start();

        let quote = value_part.chars().next().filter(|c| *c == '"' || *c == '\'');
        let Some(quote) = quote else {
            crate::log_debug!("Attribute '{}' value is not quoted, skipped", name);
            rest = skip_token(value_part);
            continue;
        };
        let body = &value_part[1..];
        match body.find(quote) {
            Some(close) => {
                if !name.is_empty() {
                    attributes.insert(name.to_string(), body[..close].to_string());
                }
                rest = &body[close + 1..];
            }
            None => {
                crate::log_debug!("Attribute '{}' value is not closed, skipped", name);
                break;
            }
        }
    }
    attributes
}

fn skip_token(input: &str) -> &str {
    let end = input
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_whitespace())
        .map_or(input.len(), |(idx, _)| idx);
    &input[end..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn scan_all(pending: &str, ctx: &TagContext<'_>) -> TagScan {
        scan(pending, ctx, 256)
    }

    #[test]
    fn test_open_known_tool() {
        let tools = names(&["write_file", "read_files"]);
        let ctx = TagContext::new(NameSet::Only(&tools), None);
        assert_eq!(scan_all("<", &ctx), TagScan::NeedMore);
        assert_eq!(scan_all("<wri", &ctx), TagScan::NeedMore);
        assert_eq!(scan_all("<write_file", &ctx), TagScan::NeedMore);
        assert_eq!(
            scan_all("<write_file>", &ctx),
            TagScan::Open {
                name: "write_file".to_string(),
                attributes: Attributes::new()
            }
        );
    }

    #[test]
    fn test_unknown_names_released_early() {
        let tools = names(&["write_file"]);
        let ctx = TagContext::new(NameSet::Only(&tools), None);
        assert_eq!(scan_all("<yo", &ctx), TagScan::Literal);
        assert_eq!(scan_all("< ", &ctx), TagScan::Literal);
        assert_eq!(scan_all("<3", &ctx), TagScan::Literal);
        assert_eq!(scan_all("<<", &ctx), TagScan::Literal);
        // No element is open, so nothing can close.
        assert_eq!(scan_all("</write_file>", &ctx), TagScan::Literal);
    }

    #[test]
    fn test_prefix_names_need_exact_match() {
        let tools = names(&["tag", "tag_with_suffix"]);
        let ctx = TagContext::new(NameSet::Only(&tools), None);
        assert_eq!(scan_all("<tag_", &ctx), TagScan::NeedMore);
        assert!(matches!(scan_all("<tag>", &ctx), TagScan::Open { name, .. } if name == "tag"));
        assert!(matches!(
            scan_all("<tag_with_suffix>", &ctx),
            TagScan::Open { name, .. } if name == "tag_with_suffix"
        ));
        assert_eq!(scan_all("<tag_with>", &ctx), TagScan::Literal);
    }

    #[test]
    fn test_close_matches_innermost_only() {
        let ctx = TagContext::new(NameSet::Nothing, Some("path"));
        assert_eq!(scan_all("</pa", &ctx), TagScan::NeedMore);
        assert_eq!(
            scan_all("</path >", &ctx),
            TagScan::Close {
                name: "path".to_string()
            }
        );
        assert_eq!(scan_all("</path", &ctx), TagScan::NeedMore);
        assert_eq!(scan_all("</content>", &ctx), TagScan::Literal);
        assert_eq!(scan_all("</path x>", &ctx), TagScan::Literal);
        assert_eq!(scan_all("</pathx>", &ctx), TagScan::Literal);
    }

    #[test]
    fn test_attributes_and_quoted_gt() {
        let tools = names(&["run_terminal_command"]);
        let ctx = TagContext::new(NameSet::Only(&tools), None);
        assert_eq!(
            scan_all(r#"<run_terminal_command id="a>b""#, &ctx),
            TagScan::NeedMore
        );
        let scanned = scan_all(r#"<run_terminal_command id="a>b" mode = 'x'>"#, &ctx);
        let TagScan::Open { attributes, .. } = scanned else {
            panic!("expected open tag, got {scanned:?}");
        };
        assert_eq!(attributes.get("id").map(String::as_str), Some("a>b"));
        assert_eq!(attributes.get("mode").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_self_closing_is_literal() {
        let tools = names(&["end_turn"]);
        let ctx = TagContext::new(NameSet::Only(&tools), None);
        assert_eq!(scan_all("<end_turn />", &ctx), TagScan::Literal);
        assert_eq!(scan_all("<end_turn/>", &ctx), TagScan::Literal);
    }

    #[test]
    fn test_any_name_set() {
        let ctx = TagContext::new(NameSet::Any, Some("set_output"));
        assert!(matches!(
            scan_all("<whatever-key>", &ctx),
            TagScan::Open { name, .. } if name == "whatever-key"
        ));
        assert_eq!(
            scan_all("</set_output>", &ctx),
            TagScan::Close {
                name: "set_output".to_string()
            }
        );
    }

    #[test]
    fn test_length_cap() {
        let ctx = TagContext::new(NameSet::Any, None);
        let long = format!("<{}", "a".repeat(20));
        assert_eq!(scan(&long, &ctx, 16), TagScan::Literal);
        assert_eq!(scan(&long, &ctx, 64), TagScan::NeedMore);
    }

    #[test]
    fn test_parse_attributes_tolerance() {
        let attrs = parse_attributes(r#" a="1" b = '2' c=bare d e="unclosed"#);
        assert_eq!(attrs.get("a").map(String::as_str), Some("1"));
        assert_eq!(attrs.get("b").map(String::as_str), Some("2"));
        assert!(!attrs.contains_key("c"));
        assert!(!attrs.contains_key("d"));
        assert!(!attrs.contains_key("e"));
        assert!(parse_attributes("").is_empty());
    }
}
