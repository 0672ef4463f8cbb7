//! Replicate predictions API.

use super::http::{build_client, error_body};
use crate::error::ErrorContext;
use crate::provider::{UpstreamBackend, UpstreamError};
use crate::{Error, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

/// Seconds Replicate may hold the create request open before answering with a pending prediction.
const SYNC_WAIT_SECS: u64 = 60;
const MAX_ERROR_BODY_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

enum PredictionState {
    Done(Value),
    Pending(String),
}

/// Runs models through `POST /v1/predictions`, waiting synchronously first and
/// polling the prediction's `get` URL while it is still running.
#[derive(Clone)]
pub struct ReplicateBackend {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl ReplicateBackend {
    /// Configuration from the environment:
    /// - `REPLICATE_API_BASE_URL` (default `https://api.replicate.com`)
    /// - `AI_LIB_REPLICATE_POLL_INTERVAL_MS` (default 500)
    /// - `AI_LIB_REPLICATE_MAX_WAIT_SECS` (default 600)
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("REPLICATE_API_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let poll_ms = env::var("AI_LIB_REPLICATE_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(500);
        let max_wait_secs = env::var("AI_LIB_REPLICATE_MAX_WAIT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(600);

        Self::new(build_client()?, &base_url).map(|b| {
            b.with_poll_interval(Duration::from_millis(poll_ms))
                .with_max_wait(Duration::from_secs(max_wait_secs))
        })
    }

    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: validate_base_url(base_url)?,
            poll_interval: Duration::from_millis(500),
            max_wait: Duration::from_secs(600),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = validate_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint and body for a model reference: `owner/name` uses the model's own
    /// predictions route, `owner/name:version` pins a version on the generic route.
    fn create_request(&self, model: &str, input: Value) -> (String, Value) {
        match model.split_once(':') {
            Some((_, version)) => (
                format!("{}/v1/predictions", self.base_url),
                json!({ "version": version, "input": input }),
            ),
            None => (
                format!("{}/v1/models/{}/predictions", self.base_url, model),
                json!({ "input": input }),
            ),
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> std::result::Result<Prediction, UpstreamError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: error_body(resp, MAX_ERROR_BODY_CHARS).await,
            });
        }
        Ok(resp.json::<Prediction>().await?)
    }

    async fn poll(&self, url: &str, credential: &SecretString) -> std::result::Result<Value, UpstreamError> {
        let started = Instant::now();
        let mut next = url.to_string();
        loop {
            if started.elapsed() >= self.max_wait {
                return Err(UpstreamError::Timeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
            let prediction = self
                .send(self.client.get(&next).bearer_auth(credential.expose_secret()))
                .await?;
            match settle(prediction)? {
                PredictionState::Done(output) => return Ok(output),
                PredictionState::Pending(url) => next = url,
            }
        }
    }
}

/// Map a prediction onto its terminal output, or the URL to poll next.
fn settle(prediction: Prediction) -> std::result::Result<PredictionState, UpstreamError> {
    trace!(id = ?prediction.id, status = %prediction.status, "prediction status");
    match prediction.status.as_str() {
        "succeeded" => Ok(PredictionState::Done(prediction.output)),
        "failed" | "canceled" => {
            let reason = match prediction.error {
                Some(Value::String(s)) => s,
                Some(Value::Null) | None => prediction.status,
                Some(other) => other.to_string(),
            };
            Err(UpstreamError::PredictionFailed(reason))
        }
        _ => prediction
            .urls
            .and_then(|u| u.get)
            .map(PredictionState::Pending)
            .ok_or_else(|| {
                UpstreamError::Other(format!(
                    "prediction is {} but has no status URL",
                    prediction.status
                ))
            }),
    }
}

fn validate_base_url(raw: &str) -> Result<String> {
    Url::parse(raw).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid Replicate base URL '{}': {}", raw, e),
            ErrorContext::new().with_field_path("REPLICATE_API_BASE_URL"),
        )
    })?;
    Ok(raw.trim_end_matches('/').to_string())
}

#[async_trait]
impl UpstreamBackend for ReplicateBackend {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn run(
        &self,
        model: &str,
        input: Value,
        credential: &SecretString,
    ) -> std::result::Result<Value, UpstreamError> {
        let (url, body) = self.create_request(model, input);
        debug!("POST {}", url);
        let prediction = self
            .send(
                self.client
                    .post(&url)
                    .bearer_auth(credential.expose_secret())
                    .header("Prefer", format!("wait={}", SYNC_WAIT_SECS))
                    .json(&body),
            )
            .await?;
        match settle(prediction)? {
            PredictionState::Done(output) => Ok(output),
            PredictionState::Pending(next) => self.poll(&next, credential).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> ReplicateBackend {
        ReplicateBackend::new(reqwest::Client::new(), "https://api.example.test/").unwrap()
    }

    #[test]
    fn test_create_request_unversioned() {
        let (url, body) = backend().create_request("meta/llama", json!({"prompt": "hi"}));
        assert_eq!(url, "https://api.example.test/v1/models/meta/llama/predictions");
        assert_eq!(body, json!({"input": {"prompt": "hi"}}));
    }

    #[test]
    fn test_create_request_versioned() {
        let (url, body) = backend().create_request("meta/guard:abc123", json!({}));
        assert_eq!(url, "https://api.example.test/v1/predictions");
        assert_eq!(body, json!({"version": "abc123", "input": {}}));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ReplicateBackend::new(reqwest::Client::new(), "not a url").err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_settle_statuses() {
        let done: Prediction = serde_json::from_value(json!({"status": "succeeded", "output": ["a", "b"]})).unwrap();
        assert!(matches!(settle(done), Ok(PredictionState::Done(v)) if v == json!(["a", "b"])));

        let failed: Prediction = serde_json::from_value(json!({"status": "failed", "error": "OOM"})).unwrap();
        assert!(matches!(settle(failed), Err(UpstreamError::PredictionFailed(r)) if r == "OOM"));

        let pending: Prediction =
            serde_json::from_value(json!({"status": "processing", "urls": {"get": "https://x/p/1"}})).unwrap();
        assert!(matches!(settle(pending), Ok(PredictionState::Pending(u)) if u == "https://x/p/1"));

        let lost: Prediction = serde_json::from_value(json!({"status": "starting"})).unwrap();
        assert!(matches!(settle(lost), Err(UpstreamError::Other(_))));
    }
}
