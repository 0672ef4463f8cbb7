//! Image generation adapter. Output is a markdown image reference.

use super::core::{CallStrategy, Interpreted, ProviderBuilder, ProviderCore};
use super::upstream::UpstreamError;
use super::ApiProvider;
use crate::cache::{CacheKey, CacheKeyBuilder};
use crate::normalize::{diagnostic_excerpt, upstream_failure};
use crate::types::{CallContext, CallOptions, ProviderResponse};
use crate::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

const DEFAULT_DIMENSION: u32 = 768;
const MAX_ALT_CHARS: usize = 50;

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n|\r").expect("static regex"));

/// Markdown-safe alt text: line breaks become spaces, square brackets become parentheses,
/// and anything over 50 characters is cut to 47 plus `...`.
pub fn image_alt_text(prompt: &str) -> String {
    let sanitized = LINE_BREAKS
        .replace_all(prompt, " ")
        .replace('[', "(")
        .replace(']', ")");
    if sanitized.chars().count() > MAX_ALT_CHARS {
        let mut cut: String = sanitized.chars().take(MAX_ALT_CHARS - 3).collect();
        cut.push_str("...");
        cut
    } else {
        sanitized
    }
}

/// First URL in an image payload: the first element of an array, or a bare string.
fn image_url(payload: &Value) -> Option<&str> {
    let url = match payload {
        Value::Array(items) => items.first()?.as_str(),
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }?;
    (!url.is_empty()).then_some(url)
}

pub struct ImageRequest {
    pub prompt: String,
    pub context: Option<CallContext>,
}

impl ImageRequest {
    fn render(&self, payload: &Value) -> Option<ProviderResponse> {
        image_url(payload)
            .map(|url| ProviderResponse::success(format!("![{}]({})", image_alt_text(&self.prompt), url)))
    }
}

pub struct ImageStrategy;

impl CallStrategy for ImageStrategy {
    type Request = ImageRequest;
    type Response = ProviderResponse;

    /// Keyed on the (prompt, context) pair only: the context (e.g. reference images)
    /// identifies an image request more than the textual options do.
    fn cache_key(&self, core: &ProviderCore, request: &ImageRequest) -> CacheKey {
        let identity = core.identity();
        CacheKeyBuilder::new(format!("{}:image", identity.name()))
            .json(&json!({ "context": request.context, "prompt": request.prompt }))
            .build()
    }

    fn upstream_input(&self, core: &ProviderCore, request: &ImageRequest) -> Value {
        let opts = core.options();
        let mut input = opts.upstream_params();
        input.insert("width".into(), json!(opts.width.unwrap_or(DEFAULT_DIMENSION)));
        input.insert("height".into(), json!(opts.height.unwrap_or(DEFAULT_DIMENSION)));
        input.insert("prompt".into(), Value::String(request.prompt.clone()));
        Value::Object(input)
    }

    fn interpret(&self, request: &ImageRequest, payload: Value) -> Interpreted<ProviderResponse> {
        match request.render(&payload) {
            Some(response) => Interpreted::cacheable(response, payload.to_string()),
            None => Interpreted::uncached(ProviderResponse::failure(format!(
                "No image URL found in response: {}",
                diagnostic_excerpt(&payload)
            ))),
        }
    }

    fn from_cache(&self, request: &ImageRequest, entry: &str) -> Option<ProviderResponse> {
        let payload: Value = serde_json::from_str(entry).ok()?;
        request.render(&payload).map(|r| r.with_cached(true))
    }

    fn upstream_failure(&self, error: UpstreamError) -> ProviderResponse {
        upstream_failure(error)
    }
}

/// Text-to-image generation. The response output is `![alt](url)`.
pub struct ImageProvider {
    core: ProviderCore,
}

impl ImageProvider {
    pub fn new(builder: ProviderBuilder) -> Result<Self> {
        Ok(Self {
            core: builder.into_core()?,
        })
    }

    pub fn core(&self) -> &ProviderCore {
        &self.core
    }
}

impl std::fmt::Display for ImageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.core.identity())
    }
}

#[async_trait]
impl ApiProvider for ImageProvider {
    fn id(&self) -> String {
        self.core.identity().id()
    }

    fn label(&self) -> Option<&str> {
        self.core.identity().label()
    }

    async fn call_api(
        &self,
        prompt: &str,
        context: Option<&CallContext>,
        options: Option<&CallOptions>,
    ) -> Result<ProviderResponse> {
        let request = ImageRequest {
            prompt: prompt.to_string(),
            context: context.cloned(),
        };
        self.core.execute(&ImageStrategy, request, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alt_text_sanitized() {
        assert_eq!(image_alt_text("A [cat]\nsitting"), "A (cat) sitting");
        assert_eq!(image_alt_text("one\r\ntwo\rthree"), "one two three");
    }

    #[test]
    fn test_alt_text_truncated() {
        let prompt = "x".repeat(60);
        let alt = image_alt_text(&prompt);
        assert_eq!(alt, format!("{}...", "x".repeat(47)));
        assert_eq!(image_alt_text(&"y".repeat(50)), "y".repeat(50));
    }

    #[test]
    fn test_url_extraction() {
        assert_eq!(image_url(&json!(["https://x/1.png", "https://x/2.png"])), Some("https://x/1.png"));
        assert_eq!(image_url(&json!("https://x/only.png")), Some("https://x/only.png"));
        assert_eq!(image_url(&json!([])), None);
        assert_eq!(image_url(&json!({"url": "https://x"})), None);
        assert_eq!(image_url(&json!([""])), None);
    }
}
