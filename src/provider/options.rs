//! Provider options: a typed record of recognised keys plus an open pass-through map.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text wrapped around every prompt before it is keyed and sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptAffixes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// Options for one configured backend.
///
/// Recognised keys are typed fields. Every other key lands in `extra` and is forwarded
/// to the upstream untouched; unknown keys are never rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderOptions {
    /// Credential override. Never forwarded upstream, never part of a cache key.
    #[serde(default, alias = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptAffixes>,
    #[serde(default, alias = "systemPrompt", skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Image width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Image height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prompt.get_or_insert_with(PromptAffixes::default).prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.prompt.get_or_insert_with(PromptAffixes::default).suffix = Some(suffix.into());
        self
    }

    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, t: f64) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn with_max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Add a pass-through key.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prompt.as_ref().and_then(|p| p.prefix.as_deref())
    }

    pub fn suffix(&self) -> Option<&str> {
        self.prompt.as_ref().and_then(|p| p.suffix.as_deref())
    }

    /// Everything that goes to the upstream: recognised tuning keys plus `extra`,
    /// without the credential and without the prompt affix block.
    pub fn upstream_params(&self) -> Map<String, Value> {
        let mut map = self.as_map();
        map.remove("prompt");
        map
    }

    /// The options as they identify a request in the cache (credential excluded).
    pub fn cache_fingerprint(&self) -> Value {
        Value::Object(self.as_map())
    }

    fn as_map(&self) -> Map<String, Value> {
        let redacted = ProviderOptions {
            api_key: None,
            ..self.clone()
        };
        match serde_json::to_value(redacted) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_keys_are_kept() {
        let opts = ProviderOptions::from_json_value(json!({
            "apiKey": "r8_secret",
            "temperature": 0.3,
            "lora_scale": 0.8,
            "custom": {"nested": true}
        }))
        .unwrap();
        assert_eq!(opts.api_key.as_deref(), Some("r8_secret"));
        assert_eq!(opts.temperature, Some(0.3));
        let params = opts.upstream_params();
        assert_eq!(params["lora_scale"], json!(0.8));
        assert_eq!(params["custom"], json!({"nested": true}));
        assert!(!params.contains_key("api_key"));
        assert!(!params.contains_key("apiKey"));
    }

    #[test]
    fn test_yaml_options() {
        let yaml = "apiKey: abc\nprompt:\n  prefix: '<s>'\n  suffix: '</s>'\nsystemPrompt: Be nice\nwidth: 512\nrefine: expert_ensemble_refiner\n";
        let opts = ProviderOptions::from_yaml_str(yaml).unwrap();
        assert_eq!(opts.prefix(), Some("<s>"));
        assert_eq!(opts.suffix(), Some("</s>"));
        assert_eq!(opts.system_prompt.as_deref(), Some("Be nice"));
        assert_eq!(opts.width, Some(512));
        assert_eq!(opts.extra["refine"], json!("expert_ensemble_refiner"));
    }

    #[test]
    fn test_upstream_params_drop_affixes_and_credential() {
        let opts = ProviderOptions::new()
            .with_api_key("k")
            .with_prefix("P:")
            .with_max_tokens(64);
        let params = opts.upstream_params();
        assert_eq!(params.get("max_tokens"), Some(&json!(64)));
        assert!(params.get("prompt").is_none());
        assert!(params.get("api_key").is_none());
    }

    #[test]
    fn test_fingerprint_excludes_credential() {
        let a = ProviderOptions::new().with_api_key("one").with_temperature(0.1);
        let b = ProviderOptions::new().with_api_key("two").with_temperature(0.1);
        assert_eq!(a.cache_fingerprint(), b.cache_fingerprint());
        assert_ne!(
            a.cache_fingerprint(),
            ProviderOptions::new().with_temperature(0.2).cache_fingerprint()
        );
    }
}
