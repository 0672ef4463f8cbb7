//! # ai-lib-providers
//!
//! 统一的模型 Provider 适配层：同一调用契约覆盖文本生成、内容审核与图像生成，
//! 内置响应缓存、凭证解析与输出归一化。
//!
//! Provider adapters for hosted model backends. One calling contract covers text
//! generation, content moderation and image generation; callers never learn which
//! backend answers.
//!
//! ## Overview
//!
//! Every adapter runs the same call sequence:
//!
//! 1. require a credential (`Err(Error::Configuration)` otherwise, before any network activity),
//! 2. derive a deterministic cache key and return a usable cache hit marked `cached`,
//! 3. otherwise call the upstream once, interpret the payload into an envelope,
//! 4. write the cacheable part back (best-effort) and return.
//!
//! Upstream errors and unusable payloads never surface as `Err`; they become failure
//! envelopes with a descriptive message.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_lib_providers::registry::load_api_provider;
//! use ai_lib_providers::provider::{EnvOverrides, ProviderOptions};
//!
//! #[tokio::main]
//! async fn main() -> ai_lib_providers::Result<()> {
//!     ai_lib_providers::logging::init();
//!     ai_lib_providers::settings::init_from_env()?;
//!
//!     let provider = load_api_provider(
//!         "replicate:meta/meta-llama-3-8b-instruct",
//!         ProviderOptions::new().with_temperature(0.5),
//!         EnvOverrides::new(),
//!     )?;
//!     let response = provider.call_api("Write a haiku about caches", None, None).await?;
//!     match response.output() {
//!         Some(text) => println!("{}", text),
//!         None => eprintln!("failed: {:?}", response.error()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`provider`] | Adapter contract, shared core, text / moderation / image adapters |
//! | [`registry`] | `replicate:...` provider paths to adapter instances |
//! | [`transport`] | Replicate predictions API over `reqwest` |
//! | [`cache`] | Response cache: key derivation, memory / disk backends, manager |
//! | [`prompt`] | Chat prompt parsing and prefix/suffix affixing |
//! | [`normalize`] | Upstream output normalisation |
//! | [`moderation`] | Moderation taxonomy and classifier |
//! | [`settings`] | Process-wide runtime settings and cache toggle |
//! | [`types`] | Messages, envelopes, call context |

pub mod cache;
pub mod logging;
pub mod moderation;
pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use provider::{
    ApiProvider, ImageProvider, ModerationApiProvider, ModerationProvider, ProviderBuilder,
    ProviderOptions, TextProvider,
};
pub use registry::{load_api_provider, load_moderation_provider, load_provider};
pub use types::{
    message::{Message, MessageRole},
    response::{CallContext, CallOptions, ModerationFlag, ModerationResponse, ProviderResponse},
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
