//! 上游响应归一化：把任意形状的上游负载映射为统一的结果信封。
//!
//! Upstream payload normalisation.
//!
//! Backends answer with token arrays, bare strings or arbitrary JSON. The policy, in order:
//!
//! 1. non-empty array of strings → concatenation
//! 2. string → verbatim
//! 3. anything else → its JSON text
//!
//! Token usage is left empty because these payloads carry none.

use crate::types::ProviderResponse;
use serde_json::Value;
use std::fmt::Display;

/// Longest slice of raw upstream output embedded in a failure message.
pub const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// Map an upstream payload to a success envelope.
pub fn normalize_output(payload: &Value) -> ProviderResponse {
    ProviderResponse::success(payload_to_text(payload))
}

fn payload_to_text(payload: &Value) -> String {
    if let Some(joined) = join_fragments(payload) {
        return joined;
    }
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join_fragments(payload: &Value) -> Option<String> {
    let items = payload.as_array().filter(|a| !a.is_empty())?;
    let mut out = String::new();
    for item in items {
        out.push_str(item.as_str()?);
    }
    Some(out)
}

/// Textual form of a payload, or `None` when the upstream produced nothing
/// (`null`, empty string, empty array).
pub fn payload_text(payload: &Value) -> Option<String> {
    let text = match payload {
        Value::Null => return None,
        Value::Array(items) if items.is_empty() => return None,
        other => payload_to_text(other),
    };
    (!text.is_empty()).then_some(text)
}

/// Failure envelope for an upstream call that errored or was rejected.
pub fn upstream_failure(err: impl Display) -> ProviderResponse {
    ProviderResponse::failure(call_error_message(err))
}

pub fn call_error_message(err: impl Display) -> String {
    format!("API call error: {}", err)
}

/// JSON-quote `raw` and cut it to [`MAX_DIAGNOSTIC_CHARS`] characters.
pub fn diagnostic_excerpt(raw: &Value) -> String {
    let text = raw.to_string();
    if text.chars().count() <= MAX_DIAGNOSTIC_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_fragments_are_concatenated() {
        let r = normalize_output(&json!(["Hel", "lo"]));
        assert_eq!(r.output(), Some("Hello"));
        assert!(r.token_usage().unwrap().is_empty());
        assert!(!r.is_cached());
    }

    #[test]
    fn test_bare_string_is_verbatim() {
        assert_eq!(normalize_output(&json!("Hi")).output(), Some("Hi"));
    }

    #[test]
    fn test_structured_value_becomes_json_text() {
        let r = normalize_output(&json!({"text": "hi", "score": 2}));
        let back: Value = serde_json::from_str(r.output().unwrap()).unwrap();
        assert_eq!(back, json!({"text": "hi", "score": 2}));
    }

    #[test]
    fn test_mixed_or_empty_arrays_fall_back_to_json() {
        assert_eq!(normalize_output(&json!(["a", 1])).output(), Some(r#"["a",1]"#));
        assert_eq!(normalize_output(&json!([])).output(), Some("[]"));
        assert_eq!(normalize_output(&Value::Null).output(), Some("null"));
    }

    #[test]
    fn test_payload_text_absence() {
        assert_eq!(payload_text(&Value::Null), None);
        assert_eq!(payload_text(&json!("")), None);
        assert_eq!(payload_text(&json!([])), None);
        assert_eq!(payload_text(&json!(["un", "safe"])).as_deref(), Some("unsafe"));
        assert_eq!(payload_text(&json!("safe")).as_deref(), Some("safe"));
    }

    #[test]
    fn test_upstream_failure_embeds_error() {
        let r = upstream_failure("HTTP 502: bad gateway");
        assert_eq!(r.error(), Some("API call error: HTTP 502: bad gateway"));
    }

    #[test]
    fn test_diagnostic_excerpt_is_truncated() {
        let long = json!("x".repeat(2000));
        let excerpt = diagnostic_excerpt(&long);
        assert_eq!(excerpt.chars().count(), MAX_DIAGNOSTIC_CHARS + 3);
        assert!(excerpt.starts_with("\"xxx"));
        assert_eq!(diagnostic_excerpt(&json!("short")), "\"short\"");
    }
}
