//! The upstream boundary: an opaque remote call taking a model id and an input object.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("prediction failed: {0}")]
    PredictionFailed(String),

    #[error("prediction did not finish within {waited_ms} ms")]
    Timeout { waited_ms: u64 },

    #[error("{0}")]
    Other(String),
}

/// A remote model runner.
///
/// Implementations return whatever payload the backend produced; shape interpretation
/// is the adapter's job.
#[async_trait]
pub trait UpstreamBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        model: &str,
        input: Value,
        credential: &SecretString,
    ) -> Result<Value, UpstreamError>;
}
