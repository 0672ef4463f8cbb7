//! Shared adapter skeleton.
//!
//! Every adapter runs the same sequence: require a credential, derive a cache key, return
//! a decodable cache hit, otherwise call upstream once, interpret the payload and write the
//! cacheable part back. What differs per adapter (key shape, upstream input, payload
//! interpretation, cache encoding) is supplied by a [`CallStrategy`].

use super::credential::{CredentialSpec, EnvOverrides, REPLICATE_CREDENTIALS};
use super::identity::ProviderIdentity;
use super::options::ProviderOptions;
use super::upstream::{UpstreamBackend, UpstreamError};
use crate::cache::{self, CacheKey, CacheManager};
use crate::transport::ReplicateBackend;
use crate::types::CallOptions;
use crate::Result;
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Result of interpreting an upstream payload.
pub struct Interpreted<R> {
    pub response: R,
    /// Text to store under the call's key. `None` keeps the result out of the cache.
    pub cache_entry: Option<String>,
}

impl<R> Interpreted<R> {
    pub fn cacheable(response: R, entry: String) -> Self {
        Self {
            response,
            cache_entry: Some(entry),
        }
    }

    pub fn uncached(response: R) -> Self {
        Self {
            response,
            cache_entry: None,
        }
    }
}

/// The per-variant half of an adapter.
pub trait CallStrategy: Send + Sync {
    type Request: Send + Sync;
    type Response: Send;

    fn cache_key(&self, core: &ProviderCore, request: &Self::Request) -> CacheKey;

    fn upstream_input(&self, core: &ProviderCore, request: &Self::Request) -> Value;

    fn interpret(&self, request: &Self::Request, payload: Value) -> Interpreted<Self::Response>;

    /// Rebuild a response from a cache entry, marked as cached. `None` treats the entry as a miss.
    fn from_cache(&self, request: &Self::Request, entry: &str) -> Option<Self::Response>;

    fn upstream_failure(&self, error: UpstreamError) -> Self::Response;
}

/// Identity, options, credential, upstream and cache shared by all adapter variants.
///
/// Holds no per-call state; one instance serves any number of concurrent calls.
pub struct ProviderCore {
    identity: ProviderIdentity,
    options: ProviderOptions,
    credential: Option<SecretString>,
    credential_spec: CredentialSpec,
    backend: Arc<dyn UpstreamBackend>,
    cache: Option<Arc<CacheManager>>,
}

impl ProviderCore {
    pub fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// The cache this adapter reads and writes: an injected one, or the process-wide cache.
    pub fn cache(&self) -> Arc<CacheManager> {
        self.cache.clone().unwrap_or_else(cache::global)
    }

    pub fn backend(&self) -> &Arc<dyn UpstreamBackend> {
        &self.backend
    }

    /// Run one call through `strategy`.
    ///
    /// `Err` is returned only when the adapter has no credential; every other failure is
    /// folded into the strategy's failure response. There is no coalescing: concurrent calls
    /// with the same key that both miss will both reach the upstream.
    pub async fn execute<S: CallStrategy>(
        &self,
        strategy: &S,
        request: S::Request,
        call_options: Option<&CallOptions>,
    ) -> Result<S::Response> {
        let credential = self
            .credential
            .as_ref()
            .ok_or_else(|| self.credential_spec.missing_error())?;

        let cache = self.cache();
        let key = strategy.cache_key(self, &request);
        let bypass = call_options.map(|o| o.bypass_cache).unwrap_or(false);

        if !bypass {
            if let Some(entry) = cache.get_raw(&key).await {
                match strategy.from_cache(&request, &entry) {
                    Some(response) => {
                        debug!(provider = %self.identity.id(), "returning cached response");
                        return Ok(response);
                    }
                    None => debug!(provider = %self.identity.id(), "ignoring unusable cache entry"),
                }
            }
        }

        let input = strategy.upstream_input(self, &request);
        debug!(
            provider = %self.identity.id(),
            backend = self.backend.name(),
            "calling upstream model {}",
            self.identity.model()
        );
        let payload = match self.backend.run(self.identity.model(), input, credential).await {
            Ok(payload) => payload,
            Err(e) => {
                debug!(provider = %self.identity.id(), "upstream call failed: {}", e);
                return Ok(strategy.upstream_failure(e));
            }
        };

        let Interpreted {
            response,
            cache_entry,
        } = strategy.interpret(&request, payload);
        if let Some(entry) = cache_entry {
            cache.set_best_effort(&key, &entry).await;
        }
        Ok(response)
    }
}

/// Builder for the adapter variants.
///
/// The credential is resolved at build time but only required at call time, so a
/// credential-less adapter can be built (e.g. as a shared default) and fails on first use.
pub struct ProviderBuilder {
    model: String,
    options: ProviderOptions,
    env: EnvOverrides,
    id: Option<String>,
    label: Option<String>,
    backend: Option<Arc<dyn UpstreamBackend>>,
    cache: Option<Arc<CacheManager>>,
}

impl ProviderBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            options: ProviderOptions::default(),
            env: EnvOverrides::new(),
            id: None,
            label: None,
            backend: None,
            cache: None,
        }
    }

    pub fn options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }

    /// Caller-supplied environment overrides, consulted before the process environment.
    pub fn env(mut self, env: EnvOverrides) -> Self {
        self.env = env;
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Replace the upstream (defaults to [`ReplicateBackend::from_env`]).
    pub fn backend(mut self, backend: Arc<dyn UpstreamBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a specific cache instead of the process-wide one.
    pub fn cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub(crate) fn env_value(&self, key: &str) -> Option<String> {
        self.env
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .filter(|v| !v.trim().is_empty())
    }

    pub(crate) fn into_core(self) -> Result<ProviderCore> {
        let spec = REPLICATE_CREDENTIALS;
        let credential = spec.resolve(self.options.api_key.as_deref(), &self.env);
        let backend = match self.backend {
            Some(b) => b,
            None => Arc::new(ReplicateBackend::from_env()?),
        };
        let mut identity = ProviderIdentity::new("replicate", self.model);
        if let Some(id) = self.id {
            identity = identity.with_id(id);
        }
        if let Some(label) = self.label {
            identity = identity.with_label(label);
        }
        Ok(ProviderCore {
            identity,
            options: self.options,
            credential,
            credential_spec: spec,
            backend,
            cache: self.cache,
        })
    }
}
