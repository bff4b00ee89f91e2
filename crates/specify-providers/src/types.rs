//! Common types for model providers.

use serde::Serialize;

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions).
    System,
    /// User message.
    User,
}

/// A single entry of a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: MessageRole,

    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Build the message list for a prompt and its rules.
///
/// `rules` becomes a leading system message whenever it is non-empty, even if
/// it is only whitespace.
pub fn build_messages(prompt: &str, rules: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if !rules.is_empty() {
        messages.push(ChatMessage::system(rules));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rules_yield_only_user_message() {
        let messages = build_messages("Hello", "");
        assert_eq!(messages, vec![ChatMessage::user("Hello")]);
    }

    #[test]
    fn test_rules_become_leading_system_message() {
        let messages = build_messages("Hello", "Be concise.");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, "Be concise.");
        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(messages[1].content, "Hello");
    }

    #[test]
    fn test_whitespace_rules_are_kept() {
        let messages = build_messages("Hello", "   ");
        assert_eq!(messages[0], ChatMessage::system("   "));
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::system("x")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"x"}"#);
    }
}
