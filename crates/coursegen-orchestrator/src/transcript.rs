//! Append-only conversation history of one generation session.
//!
//! Each provider call receives the transcript by `&mut` and appends its
//! request and response. A chat provider sends the whole history as context,
//! which is why provider calls within one session are strictly sequential.

use serde::{Deserialize, Serialize};

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the whole session.
    System,
    /// A request sent to the provider.
    User,
    /// A provider response.
    Assistant,
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote it.
    pub role: Role,
    /// Message text.
    pub content: String,
}

/// Ordered, append-only message history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Appends a message.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
    }

    /// Appends a system message.
    pub fn push_system(&mut self, content: impl Into<String>) {
        self.push(Role::System, content);
    }

    /// Appends a user message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content);
    }

    /// Appends an assistant message.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content);
    }

    /// Returns all messages in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been exchanged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages written by `role`.
    #[must_use]
    pub fn count(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_keep_order() {
        let mut transcript = Transcript::new();
        transcript.push_system("frame");
        transcript.push_user("question");
        transcript.push_assistant("answer");

        let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(transcript.last().unwrap().content, "answer");
        assert_eq!(transcript.count(Role::User), 1);
    }

    #[test]
    fn test_serializes_as_chat_messages() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");

        let json = serde_json::to_value(&transcript).unwrap();

        assert_eq!(json, serde_json::json!([{"role": "user", "content": "hi"}]));
    }
}
