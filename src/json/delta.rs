// src/json/delta.rs
//! Incremental differences between two reconstructions of a growing JSON prefix.

use super::partial::{reconstruct, PartialParseResult};
use crate::error::{Result, StreamError};
use serde::Serialize;
use serde_json::{Map, Value};

/// Key that closed the latest reconstruction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LastParam {
    pub key: Option<String>,
    /// True only on the call where `key` is first observed complete
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaResult {
    /// String values hold only the newly appended suffix, others the full value
    pub delta: Map<String, Value>,
    /// Full reconstruction of the latest content
    pub result: Map<String, Value>,
    pub last_param: LastParam,
}

impl DeltaResult {
    /// Fold this delta into a running object: strings append onto strings,
    /// everything else replaces.
    pub fn apply_to(&self, target: &mut Map<String, Value>) {
        for (key, value) in &self.delta {
            match (target.get_mut(key), value) {
                (Some(Value::String(existing)), Value::String(suffix)) => {
                    existing.push_str(suffix)
                }
                _ => {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }
}

/// Diff the reconstruction of `content` against that of `previous`.
///
/// `content` must extend `previous`; anything else is a caller bug and is
/// returned as [`StreamError::ProtocolMisuse`].
pub fn delta(content: &str, previous: &str) -> Result<DeltaResult> {
    if !content.starts_with(previous) {
        return Err(StreamError::ProtocolMisuse {
            previous_len: previous.len(),
            content_len: content.len(),
        });
    }

    let before = reconstruct(previous);
    let after = reconstruct(content);
    Ok(diff(&before, &after))
}

/// Diff `content` against a reconstruction kept from the previous call.
///
/// Streaming callers hold on to the returned reconstruction and pass it back
/// next time, so each step reconstructs only the new content.
pub fn delta_from(before: &PartialParseResult, content: &str) -> (DeltaResult, PartialParseResult) {
    let after = reconstruct(content);
    (diff(before, &after), after)
}

fn diff(before: &PartialParseResult, after: &PartialParseResult) -> DeltaResult {
    let before_last = before.last_key();
    let mut delta = Map::new();

    for (key, value) in &after.params {
        match before.params.get(key) {
            Some(old) if old == value => {
                // Same text, but now known to be closed.
                if !before.last_param_complete && before_last == Some(key.as_str()) {
                    delta.insert(key.clone(), Value::String(String::new()));
                }
            }
            old => {
                let changed = match (value, old) {
                    (Value::String(new), Some(Value::String(old))) => {
                        Value::String(new.chars().skip(old.chars().count()).collect())
                    }
                    _ => value.clone(),
                };
                delta.insert(key.clone(), changed);
            }
        }
    }

    let key = after.last_key().map(str::to_string);
    let already_reported = before.last_param_complete && before_last == key.as_deref();
    let complete = key.is_some() && after.last_param_complete && !already_reported;

    DeltaResult {
        delta,
        result: after.params.clone(),
        last_param: LastParam { key, complete },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_new_properties() {
        let result = delta(r#"{"name": "test", "value": 42}"#, "").unwrap();
        assert_eq!(result.delta, obj(json!({"name": "test", "value": 42})));
        assert_eq!(result.result, obj(json!({"name": "test", "value": 42})));
        assert_eq!(result.last_param.key.as_deref(), Some("value"));
        assert!(result.last_param.complete);
    }

    #[test]
    fn test_string_suffix_only() {
        let result = delta(r#"{"value":100,"name":"updated"}"#, r#"{"value":100,"name":"upda"#).unwrap();
        assert_eq!(result.delta, obj(json!({"name": "ted"})));
        assert_eq!(result.result, obj(json!({"value": 100, "name": "updated"})));
        assert_eq!(
            result.last_param,
            LastParam {
                key: Some("name".to_string()),
                complete: true
            }
        );
    }

    #[test]
    fn test_unchanged_content_is_empty() {
        let content = r#"{"name": "test", "value": 42}"#;
        let result = delta(content, content).unwrap();
        assert!(result.is_empty());
        assert!(!result.last_param.complete);
    }

    #[test]
    fn test_completion_signal_on_stable_key() {
        let result = delta(r#"{"message": "Hello""#, r#"{"message": "Hello"#).unwrap();
        assert_eq!(result.delta, obj(json!({"message": ""})));
        assert!(result.last_param.complete);

        // Reported once only.
        let next = delta(r#"{"message": "Hello", "#, r#"{"message": "Hello""#).unwrap();
        assert!(next.is_empty());
        assert!(!next.last_param.complete);
    }

    #[test]
    fn test_streaming_progression() {
        let chunks = [
            r#"{"status": "proc"#,
            r#"essing", "progress": 1.0"#,
            r#", "result": "suc"#,
            r#"cess"}"#,
        ];
        let mut previous = String::new();
        let mut content = String::new();
        let mut deltas = Vec::new();
        for chunk in chunks {
            content.push_str(chunk);
            deltas.push(delta(&content, &previous).unwrap());
            previous = content.clone();
        }

        assert_eq!(deltas[0].delta, obj(json!({"status": "proc"})));
        assert!(!deltas[0].last_param.complete);
        // progress is still being typed, only status settles
        assert_eq!(deltas[1].delta, obj(json!({"status": "essing"})));
        assert!(deltas[1].last_param.complete);
        assert_eq!(deltas[2].delta, obj(json!({"progress": 1.0, "result": "suc"})));
        assert_eq!(deltas[3].delta, obj(json!({"result": "cess"})));
        assert!(deltas[3].last_param.complete);
    }

    #[test]
    fn test_non_string_values_replace() {
        let result = delta(r#"{"items": [1, 2, 3, 4]}"#, r#"{"items": [1, 2, 3]"#).unwrap();
        assert_eq!(result.delta, obj(json!({"items": [1, 2, 3, 4]})));

        let result = delta(r#"{"user": {"age": 31}}"#, r#"{"user": {"age": 3"#).unwrap();
        assert_eq!(result.delta, obj(json!({"user": {"age": 31}})));
    }

    #[test]
    fn test_invalid_content_yields_empty_delta() {
        let result = delta("not json", "").unwrap();
        assert!(result.is_empty());
        assert!(result.result.is_empty());
        assert_eq!(result.last_param, LastParam::default());
    }

    #[test]
    fn test_rejects_non_prefix_previous() {
        let err = delta("xyz", "abc").unwrap_err();
        assert!(matches!(
            err,
            StreamError::ProtocolMisuse {
                previous_len: 3,
                content_len: 3
            }
        ));
    }

    #[test]
    fn test_apply_to_reproduces_result() {
        let full = r#"{"path": "src/main.rs", "line": 12, "note": "a \"quoted\" value"}"#;
        let mut running = Map::new();
        let mut previous = "";
        for end in (1..=full.len()).filter(|i| full.is_char_boundary(*i)) {
            let content = &full[..end];
            delta(content, previous).unwrap().apply_to(&mut running);
            previous = content;
        }
        assert_eq!(running, reconstruct(full).params);
    }

    #[test]
    fn test_delta_from_matches_delta() {
        let full = r#"{"status": "processing", "progress": 1.5, "tags": ["a", "b"]}"#;
        let mut parsed = PartialParseResult::empty();
        let mut previous = "";
        for end in (1..=full.len()).step_by(3).chain([full.len()]) {
            let content = &full[..end];
            let (update, next) = delta_from(&parsed, content);
            assert_eq!(update, delta(content, previous).unwrap(), "prefix {content:?}");
            assert_eq!(next, reconstruct(content));
            parsed = next;
            previous = content;
        }
    }
}
