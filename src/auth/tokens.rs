//! Stored session tokens

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Refresh this many seconds before the server-side expiry.
const REFRESH_MARGIN_SECS: u64 = 60;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Access token plus its expiry, as persisted in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    /// Unix timestamp; `None` when the server did not report a lifetime.
    pub expires_at: Option<u64>,
}

impl StoredToken {
    pub fn new(token: String, expires_in_secs: Option<u64>) -> Self {
        Self {
            expires_at: expires_in_secs.map(|secs| unix_now() + secs),
            token,
        }
    }

    /// Expired, or close enough to expiry that a refresh is due.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| unix_now() + REFRESH_MARGIN_SECS >= exp)
            .unwrap_or(false)
    }
}

/// Storage backend for session tokens (the config file in practice).
pub trait TokenStore {
    fn get_access_token(&self) -> Option<StoredToken>;
    fn set_access_token(&mut self, token: String, expires_in: Option<u64>);
    fn get_refresh_token(&self) -> Option<String>;
    fn set_refresh_token(&mut self, token: String);
    fn clear_tokens(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_without_expiry_never_expires() {
        let t = StoredToken::new("abc".into(), None);
        assert!(!t.is_expired());
    }

    #[test]
    fn token_expiring_soon_counts_as_expired() {
        let t = StoredToken::new("abc".into(), Some(10));
        assert!(t.is_expired());
        let t = StoredToken::new("abc".into(), Some(3600));
        assert!(!t.is_expired());
    }
}
