//! Chat prompt parsing.

use crate::types::{Message, MessageRole};
use tracing::debug;

/// Ordered messages recovered from a prompt, with role lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrompt {
    messages: Vec<Message>,
    structured: bool,
}

impl ParsedPrompt {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether the prompt text itself was a role/content list.
    pub fn is_structured(&self) -> bool {
        self.structured
    }

    /// Content of the first message with `role`.
    pub fn first(&self, role: MessageRole) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }

    pub fn system(&self) -> Option<&str> {
        self.first(MessageRole::System)
    }

    pub fn user(&self) -> Option<&str> {
        self.first(MessageRole::User)
    }
}

/// Parse `prompt` into ordered messages.
///
/// A prompt that is a JSON array of `{role, content}` objects, or a YAML list starting with
/// `- role:`, is taken as the conversation. Anything else becomes one `user` message holding
/// the whole text.
///
/// `defaults` are merged in: a default is kept only when the prompt defines no message with
/// that role, and kept defaults precede the prompt's own messages.
pub fn parse_chat_prompt(prompt: &str, defaults: &[Message]) -> ParsedPrompt {
    let (parsed, structured) = match try_structured(prompt) {
        Some(messages) => (messages, true),
        None => (vec![Message::user(prompt)], false),
    };

    let mut messages: Vec<Message> = defaults
        .iter()
        .filter(|d| !parsed.iter().any(|m| m.role == d.role))
        .cloned()
        .collect();
    messages.extend(parsed);

    ParsedPrompt {
        messages,
        structured,
    }
}

fn try_structured(prompt: &str) -> Option<Vec<Message>> {
    let trimmed = prompt.trim_start();
    let parsed = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<Message>>(prompt).map_err(|e| e.to_string())
    } else if trimmed.starts_with("- role:") {
        serde_yaml::from_str::<Vec<Message>>(prompt).map_err(|e| e.to_string())
    } else {
        return None;
    };
    match parsed {
        Ok(messages) if !messages.is_empty() => Some(messages),
        Ok(_) => None,
        Err(e) => {
            debug!("prompt looks structured but is not a chat list, using it verbatim: {}", e);
            None
        }
    }
}
