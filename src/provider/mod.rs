//! Provider 适配层：统一调用契约、凭证解析、缓存与上游调用的组合。
//!
//! # Provider Adapters
//!
//! One calling contract over heterogeneous model backends. Callers hold an
//! `Arc<dyn ApiProvider>` (or `dyn ModerationApiProvider`) and never learn which backend
//! answers.
//!
//! ## Composition
//!
//! Adapters are a [`ProviderCore`] (identity, options, credential, upstream, cache) paired
//! with a [`CallStrategy`] that supplies the variant-specific parts:
//!
//! | Adapter | Cache key | Output |
//! |---------|-----------|--------|
//! | [`TextProvider`] | name, model, options, prompt | normalised text |
//! | [`ModerationProvider`] | name, model, options, prompt, assistant text | flag list |
//! | [`ImageProvider`] | (prompt, context) | `![alt](url)` |
//!
//! ## Failure model
//!
//! - Missing credential: `Err(Error::Configuration)` before any network activity.
//! - Everything else (upstream errors, unusable payloads, cache trouble): a failure envelope
//!   or a silently skipped cache write. Calls on a credentialed adapter never return `Err`.

mod core;
mod credential;
mod identity;
mod image;
mod moderation;
mod options;
mod text;
mod upstream;

pub use self::core::{CallStrategy, Interpreted, ProviderBuilder, ProviderCore};
pub use credential::{CredentialSpec, EnvOverrides, REPLICATE_CREDENTIALS};
pub use identity::ProviderIdentity;
pub use image::{image_alt_text, ImageProvider, ImageRequest, ImageStrategy};
pub use moderation::{
    default_moderation_provider, ModerationProvider, ModerationRequest, ModerationStrategy,
    DEFAULT_MODERATION_MODEL,
};
pub use options::{PromptAffixes, ProviderOptions};
pub use text::{TextProvider, TextRequest, TextStrategy};
pub use upstream::{UpstreamBackend, UpstreamError};

use crate::types::{CallContext, CallOptions, ModerationResponse, ProviderResponse};
use crate::Result;
use async_trait::async_trait;

/// The calling contract shared by text and image adapters.
#[async_trait]
pub trait ApiProvider: Send + Sync {
    fn id(&self) -> String;

    fn label(&self) -> Option<&str> {
        None
    }

    async fn call_api(
        &self,
        prompt: &str,
        context: Option<&CallContext>,
        options: Option<&CallOptions>,
    ) -> Result<ProviderResponse>;
}

/// The calling contract for moderation adapters.
#[async_trait]
pub trait ModerationApiProvider: Send + Sync {
    fn id(&self) -> String;

    /// Judge `assistant` (the model output) in the context of `prompt`.
    async fn call_moderation_api(&self, prompt: &str, assistant: &str) -> Result<ModerationResponse>;
}
