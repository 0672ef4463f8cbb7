//! 提示词处理：聊天提示解析与前后缀拼接。
//!
//! # Prompt Module
//!
//! Turns raw prompt text into what an adapter sends upstream:
//!
//! - [`parse_chat_prompt`] recognises JSON or YAML lists of role/content pairs and falls
//!   back to a single `user` message for anything else.
//! - [`ParsedPrompt`] exposes the first `system` and first `user` message for backends that
//!   take instructions and user content as separate fields.
//! - [`apply_affixes`] wraps the prompt in the configured prefix/suffix.

mod chat;

pub use chat::{parse_chat_prompt, ParsedPrompt};

/// Wrap `prompt` in the optional prefix and suffix. Empty affixes are ignored.
pub fn apply_affixes(prompt: &str, prefix: Option<&str>, suffix: Option<&str>) -> String {
    let prefix = prefix.unwrap_or_default();
    let suffix = suffix.unwrap_or_default();
    let mut out = String::with_capacity(prefix.len() + prompt.len() + suffix.len());
    out.push_str(prefix);
    out.push_str(prompt);
    out.push_str(suffix);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affixes() {
        assert_eq!(apply_affixes("body", Some("[INST] "), Some(" [/INST]")), "[INST] body [/INST]");
        assert_eq!(apply_affixes("body", None, Some("!")), "body!");
        assert_eq!(apply_affixes("body", Some(""), None), "body");
    }
}
