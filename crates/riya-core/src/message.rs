//! Conversation message types.
//!
//! `ChatMessage` is what the transcript shows; `StoredTurn` is the row shape
//! the conversation store keeps.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message from the companion.
    Assistant,
}

/// A single message in the visible transcript.
///
/// Messages are created when the user sends or when a reply is revealed, and
/// never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
    /// Timestamp when the message was created (RFC 3339).
    pub timestamp: String,
}

impl ChatMessage {
    /// Creates a user message stamped with the current time.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    /// Creates a companion message stamped with the current time.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, text)
    }

    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}

/// Identity of a transcript entry, unique within one orchestrator instance.
///
/// Ids increase monotonically, so a batch rollback can remove exactly the
/// entries it rendered even if newer ones were appended after them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// A row in the append-only conversation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTurn {
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Creation time (RFC 3339); rows are listed in this order.
    pub created_at: String,
}

impl StoredTurn {
    pub fn new(session_id: impl Into<String>, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role,
            content: content.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Converts the stored row back into a transcript message.
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            text: self.content.clone(),
            timestamp: self.created_at.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(MessageRole::User.to_string(), "user");
        assert_eq!(MessageRole::from_str("assistant").unwrap(), MessageRole::Assistant);
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_stored_turn_restores_message() {
        let turn = StoredTurn::new("guest-1", MessageRole::User, "bored hoon");
        let message = turn.to_message();
        assert!(message.is_user());
        assert_eq!(message.text, "bored hoon");
        assert_eq!(message.timestamp, turn.created_at);
    }
}
