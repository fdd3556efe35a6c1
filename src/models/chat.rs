//! Chat-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Message, User};

/// Chat entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub name: String,
    pub is_group: bool,
    pub created_at: DateTime<Utc>,
    pub created_by_id: String,
    /// Unique by user id.
    pub members: Vec<User>,
    /// Denormalized for list display.
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
}

impl Chat {
    /// Timestamp used for chat-list ordering: last message time, falling
    /// back to creation time when the chat has no messages yet.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.timestamp)
            .unwrap_or(self.created_at)
    }

    /// Display name for a 1:1 chat from the other member's perspective,
    /// falling back to the stored name.
    pub fn label(&self, current_user_id: &str) -> &str {
        if !self.is_group {
            if let Some(other) = self.members.iter().find(|m| m.id != current_user_id) {
                return other.label();
            }
        }
        &self.name
    }
}
