//! Message-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// Delivery status of a message from this client's point of view.
///
/// A locally-originated send is `Pending` until the REST call returns the
/// server-canonical record; the store then reconciles the pending record in
/// place. Messages arriving from REST pages or push events are `Confirmed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Pending,
    #[default]
    Confirmed,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub user_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    #[serde(default)]
    pub author: Option<User>,
    /// Client-side only; absent from server payloads.
    #[serde(default, skip_serializing)]
    pub status: Delivery,
}

impl Message {
    /// Build a pending record for an optimistic send.
    ///
    /// The id is a local UUID, replaced by the server-canonical id on
    /// reconciliation.
    pub fn pending(chat_id: &str, user_id: &str, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
            is_read: false,
            author: None,
            status: Delivery::Pending,
        }
    }
}

/// One page of a paginated message fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: u32,
    pub pages: u32,
    pub page: u32,
}
