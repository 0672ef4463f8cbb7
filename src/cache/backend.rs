//! Cache backend implementations.
//!
//! Backends store serialized text. They know nothing about envelopes or providers;
//! decoding lives in [`super::CacheManager`].

use super::key::CacheKey;
use crate::error::ErrorContext;
use crate::{Error, Result};
use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
}

struct MemoryEntry {
    data: String,
    /// `None` when the TTL runs past what `Instant` can represent: never expires.
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process LRU cache. Least recently read entries are evicted once `max_entries` is reached.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<String, MemoryEntry>>> {
        self.entries.lock().map_err(|_| {
            Error::cache_with_context(
                "memory cache lock poisoned",
                ErrorContext::new().with_source("memory_cache"),
            )
        })
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut entries = self.lock()?;
        let expired = match entries.get(&key.raw) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.data.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(&key.raw);
        }
        Ok(None)
    }
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()> {
        let entry = MemoryEntry {
            data: value.to_string(),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.lock()?.put(key.raw.clone(), entry);
        Ok(())
    }
    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.lock()?.pop(&key.raw).is_some())
    }
    async fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(self.lock()?.iter().filter(|(_, e)| !e.is_expired()).count())
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    value: String,
    expires_at: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One JSON file per entry, named by the SHA-256 digest of the key.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.digest()))
    }

    async fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut rd = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = rd.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl CacheBackend for FileCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let path = self.entry_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: DiskEntry = serde_json::from_slice(&bytes)?;
        if entry.expires_at <= unix_now() {
            let _ = tokio::fs::remove_file(&path).await;
            return Ok(None);
        }
        // Digest collision guard.
        if entry.key != key.raw {
            return Ok(None);
        }
        Ok(Some(entry.value))
    }
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let entry = DiskEntry {
            key: key.raw.clone(),
            value: value.to_string(),
            expires_at: unix_now().saturating_add(ttl.as_secs().max(1)),
        };
        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(&entry)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
    async fn clear(&self) -> Result<()> {
        for path in self.entry_files().await? {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(self.entry_files().await?.len())
    }
    fn name(&self) -> &'static str {
        "disk"
    }
}

pub struct NullCache;
impl NullCache {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<String>> {
        Ok(None)
    }
    async fn set(&self, _: &CacheKey, _: &str, _: Duration) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_memory_cache_evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        let (a, b, c) = (CacheKey::new("a"), CacheKey::new("b"), CacheKey::new("c"));
        cache.set(&a, "1", HOUR).await.unwrap();
        cache.set(&b, "2", HOUR).await.unwrap();
        // Touch `a` so `b` becomes the eviction candidate.
        assert_eq!(cache.get(&a).await.unwrap().as_deref(), Some("1"));
        cache.set(&c, "3", HOUR).await.unwrap();
        assert!(cache.get(&b).await.unwrap().is_none());
        assert_eq!(cache.get(&c).await.unwrap().as_deref(), Some("3"));
        assert_eq!(cache.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new(8);
        let key = CacheKey::new("k");
        cache.set(&key, "v", Duration::ZERO).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(!cache.delete(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_cache_huge_ttl_never_expires() {
        let cache = MemoryCache::new(8);
        let key = CacheKey::new("forever");
        cache.set(&key, "v", Duration::from_secs(u64::MAX)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("v"));
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_file_cache_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested"));
        let key = CacheKey::new("replicate:m:{}:hello");
        assert!(cache.get(&key).await.unwrap().is_none());
        cache.set(&key, r#"{"output":"hi"}"#, HOUR).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some(r#"{"output":"hi"}"#));
        assert_eq!(cache.len().await.unwrap(), 1);
        cache.clear().await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_null_cache_stores_nothing() {
        let cache = NullCache::new();
        let key = CacheKey::new("k");
        cache.set(&key, "v", HOUR).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());
        assert_eq!(cache.name(), "null");
    }
}
