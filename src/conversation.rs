//! Session-scoped chat history

use crate::error::{ChatError, ChatResult};
use crate::prompts::GREETING;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Speaker of a message
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Ordered chat history, seeded with the assistant greeting
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::assistant(GREETING)],
        }
    }

    /// Add a message at the end of the history
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.append(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.append(Message::assistant(content));
    }

    /// Drop everything and go back to the single greeting message
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message::assistant(GREETING));
    }

    /// Most recent message
    pub fn last(&self) -> ChatResult<&Message> {
        self.messages.last().ok_or(ChatError::EmptyState)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// True when the latest message is from the user and still needs an answer
    pub fn awaiting_response(&self) -> bool {
        matches!(self.last(), Ok(message) if message.role() == Role::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn starts_with_greeting() {
        let conversation = Conversation::new();
        assert_eq!(conversation.len(), 1);

        let first = conversation.last().unwrap();
        assert_eq!(first.role(), Role::Assistant);
        assert_eq!(first.content(), GREETING);
        assert!(!conversation.awaiting_response());
    }

    #[test]
    fn append_preserves_order() {
        let mut conversation = Conversation::new();
        conversation.push_user("What is 2+2?");
        conversation.push_assistant("4");
        conversation.push_user("And 3+3?");

        let contents: Vec<&str> = conversation.messages().iter().map(Message::content).collect();
        assert_eq!(contents, vec![GREETING, "What is 2+2?", "4", "And 3+3?"]);
        assert!(conversation.awaiting_response());
    }

    #[test]
    fn reset_returns_to_greeting() {
        let mut conversation = Conversation::new();
        conversation.push_user("one");
        conversation.push_assistant("two");
        conversation.push_user("three");
        conversation.push_assistant("four");
        assert_eq!(conversation.len(), 5);

        conversation.reset();

        assert_eq!(conversation.len(), 1);
        let only = conversation.last().unwrap();
        assert_eq!(only.role(), Role::Assistant);
        assert_eq!(only.content(), GREETING);
    }

    #[test]
    fn last_on_empty_store_fails() {
        let conversation = Conversation { messages: Vec::new() };
        assert!(conversation.is_empty());
        assert!(matches!(conversation.last(), Err(ChatError::EmptyState)));
        assert!(!conversation.awaiting_response());
    }

    #[test]
    fn roles_round_trip_as_lowercase() {
        assert_eq!(Role::User.as_ref(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
        assert!(Role::from_str("system").is_err());
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }
}
