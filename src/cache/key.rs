//! Cache key generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Deterministic identifier of a cacheable request.
///
/// `raw` is the full concatenated key; backends that need bounded key sizes
/// (e.g. the disk cache) use [`CacheKey::digest`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub raw: String,
    /// Namespace the key was built under; carried into cache log events.
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl CacheKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into(), provider: None, model: None }
    }
    pub fn as_str(&self) -> &str { &self.raw }

    /// Hex SHA-256 of the raw key.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.raw.as_bytes());
        hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.raw) }
}

impl From<&str> for CacheKey { fn from(s: &str) -> Self { Self::new(s) } }
impl From<String> for CacheKey { fn from(s: String) -> Self { Self::new(s) } }

/// Builds a key by joining parts with `:` in the order they are pushed.
///
/// Structured parts go through [`canonical_json`], so two configurations that differ only
/// in property insertion order produce the same key.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    parts: Vec<String>,
    provider: Option<String>,
    model: Option<String>,
}

impl CacheKeyBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self { parts: vec![namespace.clone()], provider: Some(namespace), model: None }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.parts.push(model.clone());
        self.model = Some(model);
        self
    }

    pub fn json(mut self, value: &Value) -> Self {
        self.parts.push(canonical_json(value));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(text.into());
        self
    }

    pub fn build(self) -> CacheKey {
        CacheKey { raw: self.parts.join(":"), provider: self.provider, model: self.model }
    }
}

/// Serialize a JSON value with object keys sorted at every depth.
///
/// Independent of whether `serde_json` was built with `preserve_order`.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
