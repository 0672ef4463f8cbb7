//! Provider 注册表：将 `replicate:<model>` 形式的路径解析为适配器实例。
//!
//! Provider path resolution.
//!
//! | Path | Adapter |
//! |------|---------|
//! | `replicate:<model>` | [`TextProvider`] |
//! | `replicate:image:<model>` | [`ImageProvider`] |
//! | `replicate:moderation:<model>` | [`ModerationProvider`] |
//!
//! Model references may themselves contain a colon (`owner/name:version`); only the
//! leading family and kind segments are consumed.

use crate::error::ErrorContext;
use crate::provider::{
    ApiProvider, EnvOverrides, ImageProvider, ModerationApiProvider, ModerationProvider,
    ProviderBuilder, ProviderOptions, TextProvider,
};
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;

const FAMILY: &str = "replicate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Text,
    Image,
    Moderation,
}

/// A parsed provider path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPath {
    pub kind: ProviderKind,
    pub model: String,
}

impl ProviderPath {
    pub fn parse(path: &str) -> Result<Self> {
        let rest = path
            .strip_prefix(FAMILY)
            .and_then(|r| r.strip_prefix(':'))
            .ok_or_else(|| unknown_path(path, "expected a `replicate:` prefix"))?;

        let (kind, model) = match rest.split_once(':') {
            Some(("image", model)) => (ProviderKind::Image, model),
            Some(("moderation", model)) => (ProviderKind::Moderation, model),
            _ => (ProviderKind::Text, rest),
        };
        if model.trim().is_empty() {
            return Err(unknown_path(path, "missing model name"));
        }
        Ok(Self {
            kind,
            model: model.to_string(),
        })
    }
}

impl fmt::Display for ProviderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ProviderKind::Text => write!(f, "{}:{}", FAMILY, self.model),
            ProviderKind::Image => write!(f, "{}:image:{}", FAMILY, self.model),
            ProviderKind::Moderation => write!(f, "{}:moderation:{}", FAMILY, self.model),
        }
    }
}

fn unknown_path(path: &str, details: &str) -> Error {
    Error::configuration_with_context(
        format!("unknown provider path '{}'", path),
        ErrorContext::new()
            .with_field_path("provider")
            .with_details(details),
    )
}

/// An adapter loaded from a path; moderation adapters have their own contract.
#[derive(Clone)]
pub enum LoadedProvider {
    Api(Arc<dyn ApiProvider>),
    Moderation(Arc<dyn ModerationApiProvider>),
}

impl LoadedProvider {
    pub fn id(&self) -> String {
        match self {
            LoadedProvider::Api(p) => p.id(),
            LoadedProvider::Moderation(p) => p.id(),
        }
    }

    pub fn into_api(self) -> Option<Arc<dyn ApiProvider>> {
        match self {
            LoadedProvider::Api(p) => Some(p),
            LoadedProvider::Moderation(_) => None,
        }
    }

    pub fn into_moderation(self) -> Option<Arc<dyn ModerationApiProvider>> {
        match self {
            LoadedProvider::Moderation(p) => Some(p),
            LoadedProvider::Api(_) => None,
        }
    }
}

/// Load the adapter named by `path`.
pub fn load_provider(path: &str, options: ProviderOptions, env: EnvOverrides) -> Result<LoadedProvider> {
    load_provider_with(path, |model| ProviderBuilder::new(model).options(options).env(env))
}

/// Like [`load_provider`], with full control over the builder (backend, cache, id).
pub fn load_provider_with<F>(path: &str, builder: F) -> Result<LoadedProvider>
where
    F: FnOnce(&str) -> ProviderBuilder,
{
    let parsed = ProviderPath::parse(path)?;
    tracing::debug!("loading provider {}", parsed);
    let builder = builder(&parsed.model);
    Ok(match parsed.kind {
        ProviderKind::Text => LoadedProvider::Api(Arc::new(TextProvider::new(builder)?)),
        ProviderKind::Image => LoadedProvider::Api(Arc::new(ImageProvider::new(builder)?)),
        ProviderKind::Moderation => LoadedProvider::Moderation(Arc::new(ModerationProvider::new(builder)?)),
    })
}

pub fn load_api_provider(path: &str, options: ProviderOptions, env: EnvOverrides) -> Result<Arc<dyn ApiProvider>> {
    load_provider(path, options, env)?.into_api().ok_or_else(|| {
        Error::configuration(format!("'{}' is a moderation provider, not a text or image provider", path))
    })
}

pub fn load_moderation_provider(
    path: &str,
    options: ProviderOptions,
    env: EnvOverrides,
) -> Result<Arc<dyn ModerationApiProvider>> {
    load_provider(path, options, env)?
        .into_moderation()
        .ok_or_else(|| Error::configuration(format!("'{}' is not a moderation provider", path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_path_keeps_version() {
        let p = ProviderPath::parse("replicate:meta/llama-2-7b:abc").unwrap();
        assert_eq!(p.kind, ProviderKind::Text);
        assert_eq!(p.model, "meta/llama-2-7b:abc");
        assert_eq!(p.to_string(), "replicate:meta/llama-2-7b:abc");
    }

    #[test]
    fn test_parse_image_and_moderation() {
        let img = ProviderPath::parse("replicate:image:stability-ai/sdxl").unwrap();
        assert_eq!((img.kind, img.model.as_str()), (ProviderKind::Image, "stability-ai/sdxl"));

        let m = ProviderPath::parse("replicate:moderation:meta/meta-llama-guard-2-8b:b06").unwrap();
        assert_eq!(m.kind, ProviderKind::Moderation);
        assert_eq!(m.model, "meta/meta-llama-guard-2-8b:b06");
    }

    #[test]
    fn test_unknown_paths_rejected() {
        for path in ["openai:gpt-4", "replicate", "replicate:", "replicate:image:"] {
            let err = ProviderPath::parse(path).unwrap_err();
            assert!(err.is_configuration(), "{}", path);
        }
    }

    #[test]
    fn test_load_by_kind() {
        let opts = ProviderOptions::new().with_api_key("r8_test");
        let text = load_provider("replicate:meta/llama", opts.clone(), EnvOverrides::new()).unwrap();
        assert_eq!(text.id(), "replicate:meta/llama");
        assert!(text.into_api().is_some());

        let guard = load_provider("replicate:moderation:meta/guard", opts.clone(), EnvOverrides::new()).unwrap();
        assert!(guard.clone().into_api().is_none());
        assert!(guard.into_moderation().is_some());

        let err = load_api_provider("replicate:moderation:meta/guard", opts, EnvOverrides::new())
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }
}
