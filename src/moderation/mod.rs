//! 内容审核：Llama Guard 风格的安全分类与固定类别表。
//!
//! # Moderation Module
//!
//! Interprets the raw text of a moderation backend. The expected format is
//!
//! ```text
//! unsafe
//! S1,S9
//! ```
//!
//! or a single `safe` line. Codes are looked up in a fixed [`ModerationTaxonomy`]; codes the
//! taxonomy does not know are dropped so that new upstream categories do not break callers.

mod classifier;
mod taxonomy;

pub use classifier::{classify, classify_response, ClassifyError, Verdict};
pub use taxonomy::{llama_guard, ModerationTaxonomy};
