use crate::provider::UpstreamError;
use crate::Result;
use reqwest::Proxy;
use std::env;
use std::time::Duration;

/// Shared `reqwest` client with env-overridable defaults.
///
/// - `AI_HTTP_TIMEOUT_SECS` / `AI_TIMEOUT_SECS` (default 90; covers the 60 s synchronous wait)
/// - `AI_HTTP_POOL_MAX_IDLE_PER_HOST` (default 32)
/// - `AI_HTTP_POOL_IDLE_TIMEOUT_SECS` (default 90)
/// - `AI_PROXY_URL`
pub fn build_client() -> Result<reqwest::Client> {
    let timeout_secs = env::var("AI_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .or_else(|| env::var("AI_TIMEOUT_SECS").ok().and_then(|s| s.parse::<u64>().ok()))
        .unwrap_or(90);

    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(
            env::var("AI_HTTP_POOL_MAX_IDLE_PER_HOST")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(32),
        )
        .pool_idle_timeout(Some(Duration::from_secs(
            env::var("AI_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(90),
        )));

    if let Ok(proxy_url) = env::var("AI_PROXY_URL") {
        match Proxy::all(&proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => tracing::warn!("ignoring invalid AI_PROXY_URL: {}", e),
        }
    }

    builder
        .build()
        .map_err(|e| crate::Error::Upstream(UpstreamError::Other(e.to_string())))
}

/// Read at most `limit` characters of an error body.
pub(crate) async fn error_body(resp: reqwest::Response, limit: usize) -> String {
    match resp.text().await {
        Ok(text) if text.chars().count() > limit => {
            let mut cut: String = text.chars().take(limit).collect();
            cut.push_str("...");
            cut
        }
        Ok(text) => text,
        Err(e) => format!("<unreadable body: {}>", e),
    }
}
