//! 类型系统模块：消息、结果信封与审核标记等核心数据类型。
//!
//! # Types Module
//!
//! Core value types shared by every adapter.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Role-tagged chat turn |
//! | [`ProviderResponse`] | Success (output + usage + cached) or failure (error) envelope |
//! | [`TokenUsage`] | Upstream-reported token accounting, possibly empty |
//! | [`ModerationFlag`] | Taxonomy code, description and confidence |
//! | [`ModerationResponse`] | Flag list (empty = safe) or failure envelope |
//! | [`CallContext`] / [`CallOptions`] | Optional caller context and per-call knobs |

pub mod message;
pub mod response;

pub use message::{Message, MessageRole};
pub use response::{
    CallContext, CallOptions, ModerationFlag, ModerationResponse, ProviderResponse, TokenUsage,
};
