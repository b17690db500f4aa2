use serde::{ Serialize, Deserialize };
use std::fmt;

/// Speaker of a chat message. Serialized lowercase, matching the wire
/// format expected by OpenAI-compatible completion APIs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

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
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hello"}"#);
    }

    #[test]
    fn test_conversation_round_trip_preserves_order() {
        let conversation = vec![
            ChatMessage::user("plan a trip"),
            ChatMessage::assistant("Where to?"),
            ChatMessage::user("Lisbon"),
        ];
        let json = serde_json::to_string(&conversation).unwrap();
        let parsed: Vec<ChatMessage> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, conversation);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = serde_json::from_str::<ChatMessage>(
            r#"{"role":"narrator","content":"hi"}"#
        );
        assert!(result.is_err());
    }
}
