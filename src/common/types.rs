use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain model đại diện một tin nhắn chat.
///
/// `id` is assigned by the backend and is the same whether the message
/// arrives through the bulk load or through the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_from(&self, username: &str) -> bool {
        self.sender == username
    }
}

/// The two participants of a chat, seen from the logged-in side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub current: String,
    pub peer: String,
}

/// One-shot user-visible notification (bulk load / send failures).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            description: description.into(),
        }
    }
}
