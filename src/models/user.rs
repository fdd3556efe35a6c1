//! User-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile as returned by the REST API.
///
/// `is_online` and `last_seen` are presence-derived: they are only ever
/// mutated by push events, never by chat/message REST responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Name shown in chat lists and message headers.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

/// Server-wide statistics from the admin endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub active_users: u64,
    pub online_users: u64,
    pub total_chats: u64,
    pub total_messages: u64,
    pub timestamp: DateTime<Utc>,
}
