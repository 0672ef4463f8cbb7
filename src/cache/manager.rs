//! Cache manager.

use super::backend::{CacheBackend, FileCache, MemoryCache, NullCache};
use super::key::CacheKey;
use crate::settings::{self, CacheBackendKind, CacheToggle, RuntimeSettings};
use crate::Result;
use once_cell::sync::Lazy;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct CacheStats { pub hits: u64, pub misses: u64, pub sets: u64, pub errors: u64 }

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 { let total = self.hits + self.misses; if total == 0 { 0.0 } else { self.hits as f64 / total as f64 } }
}

struct AtomicStats { hits: AtomicU64, misses: AtomicU64, sets: AtomicU64, errors: AtomicU64 }
impl AtomicStats {
    fn new() -> Self { Self { hits: AtomicU64::new(0), misses: AtomicU64::new(0), sets: AtomicU64::new(0), errors: AtomicU64::new(0) } }
    fn to_stats(&self) -> CacheStats { CacheStats { hits: self.hits.load(Ordering::Relaxed), misses: self.misses.load(Ordering::Relaxed), sets: self.sets.load(Ordering::Relaxed), errors: self.errors.load(Ordering::Relaxed) } }
}

/// Namespaced text store shared by every adapter.
///
/// The enable flag is consulted on every operation, so toggling it affects the next call.
/// Read failures and undecodable entries are reported as misses.
pub struct CacheManager { backend: Box<dyn CacheBackend>, toggle: Arc<CacheToggle>, ttl: Duration, stats: AtomicStats }

impl CacheManager {
    pub fn new(backend: Box<dyn CacheBackend>, toggle: Arc<CacheToggle>, ttl: Duration) -> Self {
        Self { backend, toggle, ttl, stats: AtomicStats::new() }
    }

    /// An always-enabled manager with its own toggle, independent of process settings.
    pub fn standalone(backend: Box<dyn CacheBackend>) -> Self {
        Self::new(backend, Arc::new(CacheToggle::new(true)), settings::current().cache_ttl)
    }

    pub fn from_settings(settings: &RuntimeSettings, toggle: Arc<CacheToggle>) -> Self {
        let backend: Box<dyn CacheBackend> = match settings.cache_backend {
            CacheBackendKind::Memory => Box::new(MemoryCache::new(settings.cache_max_entries)),
            CacheBackendKind::Disk => Box::new(FileCache::new(settings.cache_path.clone())),
            CacheBackendKind::Null => Box::new(NullCache::new()),
        };
        Self::new(backend, toggle, settings.cache_ttl)
    }

    pub fn is_enabled(&self) -> bool { self.toggle.is_enabled() }
    pub fn toggle(&self) -> &Arc<CacheToggle> { &self.toggle }

    pub async fn get_raw(&self, key: &CacheKey) -> Option<String> {
        if !self.is_enabled() { return None; }
        match self.backend.get(key).await {
            Ok(Some(data)) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(backend = self.backend.name(), provider = ?key.provider, model = ?key.model, "cache hit");
                Some(data)
            }
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(backend = self.backend.name(), provider = ?key.provider, model = ?key.model, "cache miss");
                None
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(backend = self.backend.name(), "cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let data = self.get_raw(key).await?;
        match serde_json::from_str(&data) {
            Ok(val) => Some(val),
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!("discarding undecodable cache entry: {}", e);
                None
            }
        }
    }

    pub async fn set_raw(&self, key: &CacheKey, value: &str) -> Result<()> {
        if !self.is_enabled() { return Ok(()); }
        match self.backend.set(key, value, self.ttl).await { Ok(()) => { self.stats.sets.fetch_add(1, Ordering::Relaxed); Ok(()) } Err(e) => { self.stats.errors.fetch_add(1, Ordering::Relaxed); Err(e) } }
    }

    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<()> {
        let data = serde_json::to_string(value)?;
        self.set_raw(key, &data).await
    }

    /// Write without failing the caller. The response was already computed; a storage
    /// failure is logged and dropped.
    pub async fn set_best_effort(&self, key: &CacheKey, value: &str) {
        match self.set_raw(key, value).await {
            Ok(()) => debug!(
                backend = self.backend.name(),
                provider = ?key.provider,
                model = ?key.model,
                "cached response for {}",
                key.digest()
            ),
            Err(e) => warn!(
                backend = self.backend.name(),
                provider = ?key.provider,
                model = ?key.model,
                "failed to cache response: {}",
                e
            ),
        }
    }

    pub async fn delete(&self, key: &CacheKey) -> Result<bool> { self.backend.delete(key).await }
    pub async fn clear(&self) -> Result<()> { self.backend.clear().await }
    pub async fn len(&self) -> Result<usize> { self.backend.len().await }

    pub fn stats(&self) -> CacheStats { self.stats.to_stats() }
    pub fn backend_name(&self) -> &'static str { self.backend.name() }
}

static GLOBAL_CACHE: Lazy<Arc<CacheManager>> =
    Lazy::new(|| Arc::new(CacheManager::from_settings(&settings::current(), settings::process_toggle())));

/// The process-wide cache, built from [`settings::current`] on first use.
pub fn global() -> Arc<CacheManager> {
    GLOBAL_CACHE.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload { output: String }

    fn manager() -> CacheManager {
        CacheManager::standalone(Box::new(MemoryCache::new(16)))
    }

    #[tokio::test]
    async fn test_typed_round_trip_and_stats() {
        let cache = manager();
        let key = CacheKey::new("k");
        assert!(cache.get::<Payload>(&key).await.is_none());
        cache.set(&key, &Payload { output: "hi".into() }).await.unwrap();
        assert_eq!(cache.get::<Payload>(&key).await, Some(Payload { output: "hi".into() }));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.sets), (1, 1, 1));
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let cache = manager();
        let key = CacheKey::new("k");
        cache.set_raw(&key, "not json").await.unwrap();
        assert!(cache.get::<Payload>(&key).await.is_none());
        assert_eq!(cache.stats().errors, 1);
    }

    #[tokio::test]
    async fn test_toggle_is_read_per_call() {
        let cache = manager();
        let key = CacheKey::new("k");
        cache.set_raw(&key, "\"v\"").await.unwrap();
        cache.toggle().set(false);
        assert!(cache.get_raw(&key).await.is_none());
        cache.set_raw(&CacheKey::new("other"), "x").await.unwrap();
        cache.toggle().set(true);
        assert_eq!(cache.get_raw(&key).await.as_deref(), Some("\"v\""));
        assert!(cache.get_raw(&CacheKey::new("other")).await.is_none());
    }
}
