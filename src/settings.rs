//! 进程级运行时设置：缓存开关、缓存后端与容量（启动时显式初始化，调用时读取）。
//!
//! # Runtime Settings
//!
//! Process-wide configuration consumed by the cache layer. Settings are loaded once at
//! startup ([`init`] / [`init_from_env`]) and read through [`current`]; nothing else in the
//! crate mutates them.
//!
//! The cache on/off switch lives in a separate [`CacheToggle`] because it is read on every
//! call: flipping it with [`enable_cache`] / [`disable_cache`] affects the next call without
//! rebuilding any adapter or cache manager.
//!
//! ## Environment
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `AI_LIB_CACHE_ENABLED` | `true` | `false`/`0`/`off`/`no` disables caching |
//! | `AI_LIB_CACHE_TYPE` | `memory` | `memory`, `disk` or `none` |
//! | `AI_LIB_CACHE_PATH` | `~/.cache/ai-lib-providers` | directory for the disk backend |
//! | `AI_LIB_CACHE_TTL_SECS` | 14 days | entry lifetime |
//! | `AI_LIB_CACHE_MAX_ENTRIES` | `10000` | in-memory capacity |

use crate::error::ErrorContext;
use crate::{Error, Result};
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Which storage medium backs the process-wide cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    Disk,
    Null,
}

impl std::str::FromStr for CacheBackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "disk" | "file" => Ok(Self::Disk),
            "none" | "null" => Ok(Self::Null),
            other => Err(Error::configuration_with_context(
                format!("unknown cache type '{}'", other),
                ErrorContext::new()
                    .with_field_path("AI_LIB_CACHE_TYPE")
                    .with_details("expected one of: memory, disk, none"),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub cache_enabled: bool,
    pub cache_backend: CacheBackendKind,
    pub cache_path: PathBuf,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_backend: CacheBackendKind::Memory,
            cache_path: default_cache_path(),
            cache_ttl: DEFAULT_TTL,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl RuntimeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from the process environment, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();
        if let Some(v) = env_value("AI_LIB_CACHE_ENABLED") {
            settings.cache_enabled = parse_flag(&v);
        }
        if let Some(v) = env_value("AI_LIB_CACHE_TYPE") {
            settings.cache_backend = v.parse()?;
        }
        if let Some(v) = env_value("AI_LIB_CACHE_PATH") {
            settings.cache_path = PathBuf::from(v);
        }
        if let Some(v) = env_value("AI_LIB_CACHE_TTL_SECS") {
            let secs = v.parse::<u64>().map_err(|e| {
                Error::configuration_with_context(
                    "invalid cache TTL",
                    ErrorContext::new()
                        .with_field_path("AI_LIB_CACHE_TTL_SECS")
                        .with_details(e.to_string()),
                )
            })?;
            settings.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = env_value("AI_LIB_CACHE_MAX_ENTRIES") {
            let n = v.parse::<usize>().map_err(|e| {
                Error::configuration_with_context(
                    "invalid cache capacity",
                    ErrorContext::new()
                        .with_field_path("AI_LIB_CACHE_MAX_ENTRIES")
                        .with_details(e.to_string()),
                )
            })?;
            settings.cache_max_entries = n.max(1);
        }
        Ok(settings)
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_cache_backend(mut self, kind: CacheBackendKind) -> Self {
        self.cache_backend = kind;
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_max_entries(mut self, n: usize) -> Self {
        self.cache_max_entries = n.max(1);
        self
    }
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("ai-lib-providers")
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(v: &str) -> bool {
    !matches!(
        v.to_ascii_lowercase().as_str(),
        "false" | "0" | "off" | "no"
    )
}

/// Atomic on/off switch consulted by a cache manager on every get/set.
#[derive(Debug)]
pub struct CacheToggle {
    enabled: AtomicBool,
}

impl CacheToggle {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl Default for CacheToggle {
    fn default() -> Self {
        Self::new(true)
    }
}

static SETTINGS: Lazy<ArcSwap<RuntimeSettings>> = Lazy::new(|| {
    let settings = RuntimeSettings::from_env().unwrap_or_else(|e| {
        tracing::warn!("ignoring invalid cache settings in environment: {}", e);
        RuntimeSettings::default()
    });
    ArcSwap::from_pointee(settings)
});

static PROCESS_TOGGLE: Lazy<Arc<CacheToggle>> =
    Lazy::new(|| Arc::new(CacheToggle::new(current().cache_enabled)));

/// Install process-wide settings. Call once at startup, before the first provider call.
pub fn init(settings: RuntimeSettings) {
    PROCESS_TOGGLE.set(settings.cache_enabled);
    SETTINGS.store(Arc::new(settings));
}

/// Load settings from the environment and install them.
pub fn init_from_env() -> Result<()> {
    init(RuntimeSettings::from_env()?);
    Ok(())
}

/// Currently installed settings.
pub fn current() -> Arc<RuntimeSettings> {
    SETTINGS.load_full()
}

/// The toggle shared by the process-wide cache manager.
pub fn process_toggle() -> Arc<CacheToggle> {
    PROCESS_TOGGLE.clone()
}

pub fn is_cache_enabled() -> bool {
    PROCESS_TOGGLE.is_enabled()
}

pub fn enable_cache() {
    PROCESS_TOGGLE.set(true);
}

pub fn disable_cache() {
    PROCESS_TOGGLE.set(false);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("memory".parse::<CacheBackendKind>().unwrap(), CacheBackendKind::Memory);
        assert_eq!(" Disk ".parse::<CacheBackendKind>().unwrap(), CacheBackendKind::Disk);
        assert_eq!("none".parse::<CacheBackendKind>().unwrap(), CacheBackendKind::Null);
        let err = "redis".parse::<CacheBackendKind>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("AI_LIB_CACHE_TYPE"));
    }

    #[test]
    fn test_flag_parsing() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("OFF"));
        assert!(!parse_flag("0"));
    }

    #[test]
    fn test_toggle_flips() {
        let toggle = CacheToggle::new(true);
        assert!(toggle.is_enabled());
        toggle.set(false);
        assert!(!toggle.is_enabled());
    }

    #[test]
    fn test_builder_clamps_capacity() {
        let s = RuntimeSettings::new()
            .with_cache_max_entries(0)
            .with_cache_backend(CacheBackendKind::Null)
            .with_cache_ttl(Duration::from_secs(5));
        assert_eq!(s.cache_max_entries, 1);
        assert_eq!(s.cache_backend, CacheBackendKind::Null);
        assert_eq!(s.cache_ttl, Duration::from_secs(5));
    }
}
