//! Shared fixtures: a scripted upstream and cache backends for adapter tests.

#![allow(dead_code)]

use ai_lib_providers::cache::{CacheBackend, CacheKey, CacheManager, MemoryCache};
use ai_lib_providers::provider::{ProviderBuilder, ProviderOptions, UpstreamBackend, UpstreamError};
use ai_lib_providers::{Error, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub enum Reply {
    Payload(Value),
    Fail(String),
}

/// Upstream that answers from a script and records every input it receives.
///
/// Once the script is exhausted the last reply repeats.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Value>>,
    inputs: Mutex<Vec<(String, Value)>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Self::with_delay(replies, Duration::ZERO)
    }

    pub fn with_delay(replies: Vec<Reply>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            inputs: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn returning(payload: Value) -> Arc<Self> {
        Self::new(vec![Reply::Payload(payload)])
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(vec![Reply::Fail(message.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<(String, Value)> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn last_input(&self) -> Value {
        self.inputs().last().map(|(_, input)| input.clone()).unwrap()
    }
}

#[async_trait]
impl UpstreamBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, model: &str, input: Value, _credential: &SecretString) -> std::result::Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push((model.to_string(), input));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Payload(v)) => {
                *self.last.lock().unwrap() = Some(v.clone());
                Ok(v)
            }
            Some(Reply::Fail(msg)) => Err(UpstreamError::Other(msg)),
            None => match self.last.lock().unwrap().clone() {
                Some(v) => Ok(v),
                None => Err(UpstreamError::Other("script exhausted".into())),
            },
        }
    }
}

/// A cache backend whose every operation fails.
pub struct BrokenCache;

#[async_trait]
impl CacheBackend for BrokenCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<String>> {
        Err(Error::cache("backend unavailable"))
    }
    async fn set(&self, _key: &CacheKey, _value: &str, _ttl: Duration) -> Result<()> {
        Err(Error::cache("backend unavailable"))
    }
    async fn delete(&self, _key: &CacheKey) -> Result<bool> {
        Err(Error::cache("backend unavailable"))
    }
    async fn clear(&self) -> Result<()> {
        Err(Error::cache("backend unavailable"))
    }
    async fn len(&self) -> Result<usize> {
        Err(Error::cache("backend unavailable"))
    }
    fn name(&self) -> &'static str {
        "broken"
    }
}

pub fn memory_cache() -> Arc<CacheManager> {
    Arc::new(CacheManager::standalone(Box::new(MemoryCache::new(64))))
}

/// A builder with an explicit credential, the given upstream and cache.
pub fn builder(model: &str, backend: Arc<ScriptedBackend>, cache: Arc<CacheManager>) -> ProviderBuilder {
    builder_with(model, ProviderOptions::new(), backend, cache)
}

pub fn builder_with(
    model: &str,
    options: ProviderOptions,
    backend: Arc<ScriptedBackend>,
    cache: Arc<CacheManager>,
) -> ProviderBuilder {
    let options = if options.api_key.is_some() {
        options
    } else {
        options.with_api_key("r8_test")
    };
    ProviderBuilder::new(model).options(options).backend(backend).cache(cache)
}
