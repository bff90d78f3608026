//! Conversation history value objects.
//!
//! History alternates logically user → assistant, but a handoff produces two
//! consecutive assistant turns (the deflection plus the second agent's answer)
//! before the next user turn.

use serde::{Deserialize, Serialize};

/// The role of a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single committed turn in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let turn = ChatTurn::user("hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"user\""));
    }

    #[test]
    fn roundtrip() {
        let turn = ChatTurn::assistant("hello");
        let back: ChatTurn = serde_json::from_str(&serde_json::to_string(&turn).unwrap()).unwrap();
        assert_eq!(back.role, Role::Assistant);
        assert_eq!(back.content, "hello");
    }
}
