//! Moderation adapter.

use super::core::{CallStrategy, Interpreted, ProviderBuilder, ProviderCore};
use super::upstream::UpstreamError;
use super::ModerationApiProvider;
use crate::cache::{CacheKey, CacheKeyBuilder};
use crate::moderation::{classify, classify_response, llama_guard, ModerationTaxonomy};
use crate::normalize::{call_error_message, payload_text};
use crate::types::{CallOptions, ModerationResponse};
use crate::Result;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::sync::Arc;

/// Llama Guard 2 on Replicate, the default moderation model.
pub const DEFAULT_MODERATION_MODEL: &str =
    "meta/meta-llama-guard-2-8b:b063023ee937f28e922982abdbf97b041ffe34ad3b35a53d33e1d74bb19b36c4";

pub struct ModerationRequest {
    pub prompt: String,
    /// The assistant output under evaluation.
    pub assistant: String,
}

pub struct ModerationStrategy {
    taxonomy: &'static ModerationTaxonomy,
}

impl CallStrategy for ModerationStrategy {
    type Request = ModerationRequest;
    type Response = ModerationResponse;

    fn cache_key(&self, core: &ProviderCore, request: &ModerationRequest) -> CacheKey {
        let identity = core.identity();
        CacheKeyBuilder::new(identity.name())
            .model(identity.model())
            .json(&core.options().cache_fingerprint())
            .text(request.prompt.as_str())
            .text(request.assistant.as_str())
            .build()
    }

    fn upstream_input(&self, core: &ProviderCore, request: &ModerationRequest) -> Value {
        let mut input = core.options().upstream_params();
        input.insert("prompt".into(), Value::String(request.prompt.clone()));
        input.insert("assistant".into(), Value::String(request.assistant.clone()));
        Value::Object(input)
    }

    /// Only the raw text of a successful classification is cached; malformed output is
    /// retried on the next call.
    fn interpret(&self, _request: &ModerationRequest, payload: Value) -> Interpreted<ModerationResponse> {
        let raw = payload_text(&payload);
        tracing::debug!("moderation response: {:?}", raw);
        let response = classify_response(raw.as_deref(), self.taxonomy);
        let classified = matches!(response, ModerationResponse::Flags { .. });
        match raw {
            Some(raw) if classified => Interpreted::cacheable(response, raw),
            _ => Interpreted::uncached(response),
        }
    }

    fn from_cache(&self, _request: &ModerationRequest, entry: &str) -> Option<ModerationResponse> {
        classify(Some(entry), self.taxonomy)
            .ok()
            .map(|verdict| ModerationResponse::flags(verdict.into_flags()).with_cached(true))
    }

    fn upstream_failure(&self, error: UpstreamError) -> ModerationResponse {
        ModerationResponse::failure(call_error_message(error))
    }
}

/// Classifies a (prompt, assistant output) pair with a Llama Guard style model.
pub struct ModerationProvider {
    core: ProviderCore,
    strategy: ModerationStrategy,
}

impl ModerationProvider {
    pub fn new(builder: ProviderBuilder) -> Result<Self> {
        Self::with_taxonomy(builder, llama_guard())
    }

    pub fn with_taxonomy(builder: ProviderBuilder, taxonomy: &'static ModerationTaxonomy) -> Result<Self> {
        Ok(Self {
            core: builder.into_core()?,
            strategy: ModerationStrategy { taxonomy },
        })
    }

    pub fn core(&self) -> &ProviderCore {
        &self.core
    }

    pub async fn call_moderation_api_with_options(
        &self,
        prompt: &str,
        assistant: &str,
        options: Option<&CallOptions>,
    ) -> Result<ModerationResponse> {
        let request = ModerationRequest {
            prompt: prompt.to_string(),
            assistant: assistant.to_string(),
        };
        self.core.execute(&self.strategy, request, options).await
    }
}

impl std::fmt::Display for ModerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.core.identity())
    }
}

#[async_trait]
impl ModerationApiProvider for ModerationProvider {
    fn id(&self) -> String {
        self.core.identity().id()
    }

    async fn call_moderation_api(&self, prompt: &str, assistant: &str) -> Result<ModerationResponse> {
        self.call_moderation_api_with_options(prompt, assistant, None).await
    }
}

static DEFAULT_MODERATION: OnceCell<Arc<ModerationProvider>> = OnceCell::new();

/// Shared moderation adapter for [`DEFAULT_MODERATION_MODEL`], built on first use with
/// credentials from the process environment. Building succeeds without a credential; the
/// first call then reports the missing key.
pub fn default_moderation_provider() -> Result<Arc<ModerationProvider>> {
    DEFAULT_MODERATION
        .get_or_try_init(|| ModerationProvider::new(ProviderBuilder::new(DEFAULT_MODERATION_MODEL)).map(Arc::new))
        .cloned()
}
