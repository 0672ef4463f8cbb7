//! Text / chat completion adapter.

use super::core::{CallStrategy, Interpreted, ProviderBuilder, ProviderCore};
use super::upstream::UpstreamError;
use super::ApiProvider;
use crate::cache::{CacheKey, CacheKeyBuilder};
use crate::normalize::{normalize_output, upstream_failure};
use crate::prompt::{apply_affixes, parse_chat_prompt};
use crate::types::{CallContext, CallOptions, Message, MessageRole, ProviderResponse};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

const SYSTEM_PROMPT_ENV: &str = "REPLICATE_SYSTEM_PROMPT";

pub struct TextRequest {
    /// Prompt after prefix/suffix were applied.
    pub prompt: String,
}

pub struct TextStrategy {
    /// Used when neither the prompt nor the options carry a system message.
    system_prompt_fallback: Option<String>,
}

impl CallStrategy for TextStrategy {
    type Request = TextRequest;
    type Response = ProviderResponse;

    fn cache_key(&self, core: &ProviderCore, request: &TextRequest) -> CacheKey {
        let identity = core.identity();
        CacheKeyBuilder::new(identity.name())
            .model(identity.model())
            .json(&core.options().cache_fingerprint())
            .text(request.prompt.as_str())
            .build()
    }

    fn upstream_input(&self, core: &ProviderCore, request: &TextRequest) -> Value {
        let parsed = parse_chat_prompt(&request.prompt, &[Message::user(request.prompt.as_str())]);
        let system = parsed
            .system()
            .map(str::to_string)
            .or_else(|| core.options().system_prompt.clone())
            .or_else(|| self.system_prompt_fallback.clone());
        // A single turn is sent as its bare content; a multi-turn conversation goes
        // upstream whole so no assistant or follow-up turn is lost.
        let turns = parsed
            .messages()
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .count();
        let user = match parsed.user() {
            Some(user) if turns <= 1 => user.to_string(),
            _ => request.prompt.clone(),
        };

        let mut input = core.options().upstream_params();
        if let Some(system) = system {
            input.insert("system_prompt".into(), Value::String(system));
        }
        input.insert("prompt".into(), Value::String(user));
        Value::Object(input)
    }

    fn interpret(&self, _request: &TextRequest, payload: Value) -> Interpreted<ProviderResponse> {
        let response = normalize_output(&payload);
        match serde_json::to_string(&response) {
            Ok(entry) => Interpreted::cacheable(response, entry),
            Err(_) => Interpreted::uncached(response),
        }
    }

    fn from_cache(&self, _request: &TextRequest, entry: &str) -> Option<ProviderResponse> {
        serde_json::from_str::<ProviderResponse>(entry)
            .ok()
            .filter(ProviderResponse::is_success)
            .map(|r| r.with_cached(true))
    }

    fn upstream_failure(&self, error: UpstreamError) -> ProviderResponse {
        upstream_failure(error)
    }
}

/// Chat/text completion against a hosted model.
///
/// ```rust,no_run
/// use ai_lib_providers::provider::{ApiProvider, ProviderBuilder, ProviderOptions, TextProvider};
///
/// # async fn demo() -> ai_lib_providers::Result<()> {
/// let provider = TextProvider::new(
///     ProviderBuilder::new("meta/meta-llama-3-8b-instruct")
///         .options(ProviderOptions::new().with_temperature(0.2)),
/// )?;
/// let response = provider.call_api("Say hi", None, None).await?;
/// println!("{:?}", response.output());
/// # Ok(())
/// # }
/// ```
pub struct TextProvider {
    core: ProviderCore,
    strategy: TextStrategy,
}

impl TextProvider {
    pub fn new(builder: ProviderBuilder) -> Result<Self> {
        let strategy = TextStrategy {
            system_prompt_fallback: builder.env_value(SYSTEM_PROMPT_ENV),
        };
        Ok(Self {
            core: builder.into_core()?,
            strategy,
        })
    }

    pub fn core(&self) -> &ProviderCore {
        &self.core
    }
}

impl std::fmt::Display for TextProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.core.identity())
    }
}

#[async_trait]
impl ApiProvider for TextProvider {
    fn id(&self) -> String {
        self.core.identity().id()
    }

    fn label(&self) -> Option<&str> {
        self.core.identity().label()
    }

    async fn call_api(
        &self,
        prompt: &str,
        _context: Option<&CallContext>,
        options: Option<&CallOptions>,
    ) -> Result<ProviderResponse> {
        let opts = self.core.options();
        let request = TextRequest {
            prompt: apply_affixes(prompt, opts.prefix(), opts.suffix()),
        };
        self.core.execute(&self.strategy, request, options).await
    }
}
