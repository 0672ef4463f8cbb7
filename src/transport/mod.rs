//! 传输层：上游模型服务的 HTTP 客户端与 Replicate 预测接口。
//!
//! Transport layer: the shared HTTP client and the Replicate predictions backend.

pub mod http;
pub mod replicate;

pub use replicate::{ReplicateBackend, DEFAULT_BASE_URL};
