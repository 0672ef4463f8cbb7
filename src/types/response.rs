//! Result envelopes returned by every provider call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token accounting as reported by the upstream. All fields absent when the backend
/// does not report usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<u64>,
}

impl TokenUsage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_none() && self.prompt.is_none() && self.completion.is_none()
    }
}

/// Outcome of a text or image call: exactly one of output or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderResponse {
    Success {
        output: String,
        #[serde(default)]
        token_usage: TokenUsage,
        #[serde(default)]
        cached: bool,
    },
    Failure {
        error: String,
    },
}

impl ProviderResponse {
    pub fn success(output: impl Into<String>) -> Self {
        ProviderResponse::Success {
            output: output.into(),
            token_usage: TokenUsage::empty(),
            cached: false,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ProviderResponse::Failure {
            error: error.into(),
        }
    }

    pub fn with_cached(self, cached: bool) -> Self {
        match self {
            ProviderResponse::Success {
                output,
                token_usage,
                ..
            } => ProviderResponse::Success {
                output,
                token_usage,
                cached,
            },
            failure => failure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProviderResponse::Success { .. })
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            ProviderResponse::Success { output, .. } => Some(output),
            ProviderResponse::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ProviderResponse::Failure { error } => Some(error),
            ProviderResponse::Success { .. } => None,
        }
    }

    pub fn token_usage(&self) -> Option<&TokenUsage> {
        match self {
            ProviderResponse::Success { token_usage, .. } => Some(token_usage),
            ProviderResponse::Failure { .. } => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ProviderResponse::Success { cached: true, .. })
    }
}

/// One category hit reported by a moderation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationFlag {
    pub code: String,
    pub description: String,
    /// In `[0, 1]`.
    pub confidence: f64,
}

/// Outcome of a moderation call. An empty flag list means the content was judged safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModerationResponse {
    Flags {
        flags: Vec<ModerationFlag>,
        #[serde(default)]
        cached: bool,
    },
    Failure {
        error: String,
    },
}

impl ModerationResponse {
    pub fn flags(flags: Vec<ModerationFlag>) -> Self {
        ModerationResponse::Flags {
            flags,
            cached: false,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ModerationResponse::Failure {
            error: error.into(),
        }
    }

    pub fn with_cached(self, cached: bool) -> Self {
        match self {
            ModerationResponse::Flags { flags, .. } => ModerationResponse::Flags { flags, cached },
            failure => failure,
        }
    }

    pub fn flag_list(&self) -> Option<&[ModerationFlag]> {
        match self {
            ModerationResponse::Flags { flags, .. } => Some(flags),
            ModerationResponse::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ModerationResponse::Failure { error } => Some(error),
            ModerationResponse::Flags { .. } => None,
        }
    }

    /// True when at least one category was hit.
    pub fn is_flagged(&self) -> bool {
        self.flag_list().map(|f| !f.is_empty()).unwrap_or(false)
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ModerationResponse::Flags { cached: true, .. })
    }
}

/// Caller-supplied structured context (test variables and anything else the caller tracks).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallContext {
    #[serde(default)]
    pub vars: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// Per-call knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Skip the cache lookup and always call upstream. The fresh result is still written.
    pub bypass_cache: bool,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_and_failure_are_exclusive() {
        let ok = ProviderResponse::success("Hello");
        assert_eq!(ok.output(), Some("Hello"));
        assert!(ok.error().is_none());
        assert!(ok.token_usage().unwrap().is_empty());

        let err = ProviderResponse::failure("API call error: boom");
        assert!(err.output().is_none());
        assert_eq!(err.error(), Some("API call error: boom"));
        assert!(!err.with_cached(true).is_cached());
    }

    #[test]
    fn test_envelope_serde_shape() {
        let ok = ProviderResponse::success("Hi").with_cached(true);
        let text = serde_json::to_string(&ok).unwrap();
        assert_eq!(text, r#"{"output":"Hi","token_usage":{},"cached":true}"#);
        let back: ProviderResponse = serde_json::from_str(r#"{"output":"Hi"}"#).unwrap();
        assert_eq!(back, ProviderResponse::success("Hi"));
        let fail: ProviderResponse = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert_eq!(fail.error(), Some("nope"));
    }

    #[test]
    fn test_moderation_flags_helpers() {
        let safe = ModerationResponse::flags(Vec::new());
        assert!(!safe.is_flagged());
        assert_eq!(safe.flag_list().map(|f| f.len()), Some(0));

        let unsafe_resp = ModerationResponse::flags(vec![ModerationFlag {
            code: "S1".into(),
            description: "Violent Crimes (S1)".into(),
            confidence: 1.0,
        }])
        .with_cached(true);
        assert!(unsafe_resp.is_flagged());
        assert!(unsafe_resp.is_cached());
    }

    #[test]
    fn test_context_flattens_extra() {
        let ctx = CallContext::new()
            .with_var("animal", "cat")
            .with_extra("image", "https://example.com/ref.png");
        let v = serde_json::to_value(&ctx).unwrap();
        assert_eq!(v["vars"]["animal"], "cat");
        assert_eq!(v["image"], "https://example.com/ref.png");
    }
}
