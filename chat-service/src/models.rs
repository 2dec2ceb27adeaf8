use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload carried on a room stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room: String,
    pub sender: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(room: impl Into<String>, sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room: room.into(),
            sender: sender.into(),
            content: content.into(),
            sent_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender: String,
    pub content: String,
}

impl SendMessageRequest {
    /// First problem with the request, if any.
    pub fn validate(&self) -> Option<&'static str> {
        if self.sender.trim().is_empty() {
            Some("sender is required")
        } else if self.content.trim().is_empty() {
            Some("content is required")
        } else {
            None
        }
    }
}
