//! 响应缓存模块：所有适配器共享的命名空间键值存储，避免重复的付费上游调用。
//!
//! # Response Caching Module
//!
//! A namespaced key/value text store shared by every provider adapter, so that identical
//! requests do not reach a (billed) upstream backend twice.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | Toggle-aware get/set with best-effort writes and statistics |
//! | [`CacheBackend`] | Trait for storage media |
//! | [`MemoryCache`] | In-memory LRU backend with TTL |
//! | [`FileCache`] | One-file-per-entry disk backend with TTL |
//! | [`NullCache`] | No-op backend |
//! | [`CacheKey`] / [`CacheKeyBuilder`] | Deterministic key derivation |
//!
//! ## Contract
//!
//! - Whether caching is on is read on every call (see [`crate::settings::CacheToggle`]).
//! - A read that fails, or yields text that no longer decodes, is a miss.
//! - A write that fails is logged and swallowed by [`CacheManager::set_best_effort`].
//! - There is no request coalescing: concurrent identical misses each call upstream.
//!
//! ## Example
//!
//! ```rust
//! use ai_lib_providers::cache::{CacheKeyBuilder, CacheManager, MemoryCache};
//!
//! # tokio_test::block_on(async {
//! let cache = CacheManager::standalone(Box::new(MemoryCache::new(1000)));
//! let key = CacheKeyBuilder::new("replicate")
//!     .model("meta/meta-llama-3-8b")
//!     .json(&serde_json::json!({ "temperature": 0.2 }))
//!     .text("Hello")
//!     .build();
//! cache.set_best_effort(&key, "\"cached\"").await;
//! assert_eq!(cache.get_raw(&key).await.as_deref(), Some("\"cached\""));
//! # });
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, FileCache, MemoryCache, NullCache};
pub use key::{canonical_json, CacheKey, CacheKeyBuilder};
pub use manager::{global, CacheManager, CacheStats};
