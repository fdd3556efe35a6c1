//! Per-chat typing indicator expiry

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a typing flag stays live without a refreshing event.
pub const TYPING_EXPIRY: Duration = Duration::from_secs(3);

/// Debounced typing state keyed by `(chat_id, user_id)`.
///
/// Each `is_typing: true` event (re)arms a single deadline for its pair; a
/// `false` event clears the pair immediately. `sweep` drops pairs whose
/// deadline has passed. Time is passed in explicitly so expiry is
/// deterministic under test.
#[derive(Debug, Default)]
pub struct TypingTracker {
    deadlines: HashMap<(String, String), Instant>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a typing event received at `now`.
    pub fn set(&mut self, chat_id: &str, user_id: &str, is_typing: bool, now: Instant) {
        let key = (chat_id.to_string(), user_id.to_string());
        if is_typing {
            // Insert overwrites: at most one deadline per pair.
            self.deadlines.insert(key, now + TYPING_EXPIRY);
        } else {
            self.deadlines.remove(&key);
        }
    }

    /// Whether the user is currently typing in the chat.
    pub fn is_typing(&self, chat_id: &str, user_id: &str, now: Instant) -> bool {
        self.deadlines
            .get(&(chat_id.to_string(), user_id.to_string()))
            .map(|deadline| *deadline > now)
            .unwrap_or(false)
    }

    /// Users currently typing in the given chat.
    pub fn typists(&self, chat_id: &str, now: Instant) -> Vec<String> {
        self.deadlines
            .iter()
            .filter(|((c, _), deadline)| c == chat_id && **deadline > now)
            .map(|((_, u), _)| u.clone())
            .collect()
    }

    /// Drop expired entries. Returns true when anything changed.
    pub fn sweep(&mut self, now: Instant) -> bool {
        let before = self.deadlines.len();
        self.deadlines.retain(|_, deadline| *deadline > now);
        self.deadlines.len() != before
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_flag_expires_without_refresh() {
        let mut tracker = TypingTracker::new();
        let t0 = Instant::now();
        tracker.set("c1", "u1", true, t0);

        assert!(tracker.is_typing("c1", "u1", t0 + Duration::from_secs(1)));
        assert!(!tracker.is_typing("c1", "u1", t0 + Duration::from_secs(4)));
    }

    #[test]
    fn refreshing_event_rearms_the_deadline() {
        let mut tracker = TypingTracker::new();
        let t0 = Instant::now();
        tracker.set("c1", "u1", true, t0);
        tracker.set("c1", "u1", true, t0 + Duration::from_secs(2));

        // Past the first deadline but within the second.
        assert!(tracker.is_typing("c1", "u1", t0 + Duration::from_secs(4)));
        assert!(!tracker.is_typing("c1", "u1", t0 + Duration::from_secs(6)));
    }

    #[test]
    fn false_event_clears_immediately() {
        let mut tracker = TypingTracker::new();
        let t0 = Instant::now();
        tracker.set("c1", "u1", true, t0);
        tracker.set("c1", "u1", false, t0 + Duration::from_secs(1));
        assert!(!tracker.is_typing("c1", "u1", t0 + Duration::from_secs(1)));
    }

    #[test]
    fn sweep_drops_only_expired_pairs() {
        let mut tracker = TypingTracker::new();
        let t0 = Instant::now();
        tracker.set("c1", "u1", true, t0);
        tracker.set("c1", "u2", true, t0 + Duration::from_secs(2));

        assert!(tracker.sweep(t0 + Duration::from_secs(4)));
        assert!(!tracker.is_typing("c1", "u1", t0 + Duration::from_secs(4)));
        assert!(tracker.is_typing("c1", "u2", t0 + Duration::from_secs(4)));
        // Nothing left to expire at this instant.
        assert!(!tracker.sweep(t0 + Duration::from_secs(4)));
    }

    #[test]
    fn typists_lists_per_chat() {
        let mut tracker = TypingTracker::new();
        let t0 = Instant::now();
        tracker.set("c1", "u1", true, t0);
        tracker.set("c2", "u2", true, t0);

        let typists = tracker.typists("c1", t0 + Duration::from_secs(1));
        assert_eq!(typists, vec!["u1".to_string()]);
    }
}
