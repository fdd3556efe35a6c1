//! Chat synchronization store
//!
//! The single owner of in-memory chat/message state. Reconciles three
//! concurrent sources of truth: REST snapshots (seed operations), locally
//! originated sends (optimistic append + reconcile), and push events from
//! the socket. All mutation goes through the operations here; the UI only
//! reads.
//!
//! Invariants held after every operation:
//!   - the chat list is sorted descending by last activity
//!   - the visible message list is id-deduplicated and ascending by
//!     timestamp, with arrival order preserved on equal timestamps
//!   - `unread_count` is 0 for the active chat

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};

use super::typing::TypingTracker;
use crate::models::{Chat, Delivery, Message, MessagePage};
use crate::socket::ClientEvent;

/// Result of merging a fetched message page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Applied,
    /// The fetch resolved after the active chat changed; dropped silently.
    Stale,
}

pub struct ChatStore {
    current_user_id: String,
    chats: Vec<Chat>,
    active_chat_id: Option<String>,
    /// Messages of the active chat only.
    messages: Vec<Message>,
    /// Highest loaded history page for the active chat (0 = none).
    page: u32,
    /// Total pages reported by the server for the active chat.
    pages: u32,
    typing: TypingTracker,
    loading: bool,
    connected: bool,
}

impl ChatStore {
    pub fn new(current_user_id: String) -> Self {
        Self {
            current_user_id,
            chats: Vec::new(),
            active_chat_id: None,
            messages: Vec::new(),
            page: 0,
            pages: 0,
            typing: TypingTracker::new(),
            loading: false,
            connected: false,
        }
    }

    // -- read side ----------------------------------------------------------

    pub fn current_user_id(&self) -> &str {
        &self.current_user_id
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn chat(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    pub fn active_chat_id(&self) -> Option<&str> {
        self.active_chat_id.as_deref()
    }

    pub fn active_chat(&self) -> Option<&Chat> {
        self.active_chat_id.as_deref().and_then(|id| self.chat(id))
    }

    /// Visible message list of the active chat, ascending by timestamp.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn current_page(&self) -> u32 {
        self.page
    }

    pub fn has_more_pages(&self) -> bool {
        self.page < self.pages
    }

    /// Users currently typing in the active chat.
    pub fn typists(&self, now: Instant) -> Vec<String> {
        match self.active_chat_id.as_deref() {
            Some(chat_id) => self.typing.typists(chat_id, now),
            None => Vec::new(),
        }
    }

    /// Expire stale typing flags. Returns true when anything changed.
    pub fn sweep_typing(&mut self, now: Instant) -> bool {
        self.typing.sweep(now)
    }

    // -- event intake -------------------------------------------------------

    /// Apply one normalized socket event.
    pub fn apply_event(&mut self, event: ClientEvent, now: Instant) {
        match event {
            ClientEvent::Connected => self.connected = true,
            ClientEvent::Disconnected => {
                self.connected = false;
                // Typing flags are push-maintained; drop them with the feed.
                self.typing.clear();
            }
            ClientEvent::MessageReceived(msg) => self.apply_incoming_message(msg),
            ClientEvent::PresenceChanged {
                user_id,
                online,
                last_seen,
            } => self.apply_presence(&user_id, online, last_seen),
            ClientEvent::TypingChanged {
                chat_id,
                user_id,
                is_typing,
            } => {
                // Own typing echoes are not shown.
                if user_id != self.current_user_id {
                    self.typing.set(&chat_id, &user_id, is_typing, now);
                }
            }
        }
    }

    // -- REST snapshot intake -----------------------------------------------

    /// Replace the chat collection wholesale (initial fetch / refresh).
    pub fn seed_chats(&mut self, chats: Vec<Chat>) {
        self.chats = chats;
        self.sort_chats();
        if let Some(active) = self.active_chat_id.clone() {
            self.clear_unread(&active);
        }
    }

    /// Switch the active chat. Clears the visible message list (a fresh
    /// page-1 fetch follows) and resets the new active chat's unread
    /// counter: viewing implies read.
    pub fn set_active_chat(&mut self, chat_id: Option<String>) {
        self.messages.clear();
        self.page = 0;
        self.pages = 0;
        if let Some(ref id) = chat_id {
            self.clear_unread(id);
        }
        self.active_chat_id = chat_id;
    }

    /// Merge a fetched message page into the active chat's list.
    ///
    /// Page 1 seeds/replaces; higher pages prepend older history. A page for
    /// a chat that is no longer active is stale and dropped.
    pub fn seed_messages(&mut self, chat_id: &str, page: MessagePage) -> SeedOutcome {
        if self.active_chat_id.as_deref() != Some(chat_id) {
            tracing::debug!(
                "Dropping stale message page for {} (active: {:?})",
                chat_id,
                self.active_chat_id
            );
            return SeedOutcome::Stale;
        }

        if page.page <= 1 {
            self.messages = page.messages;
            self.page = 1;
        } else {
            let mut merged = page.messages;
            merged.append(&mut self.messages);
            self.messages = merged;
            self.page = self.page.max(page.page);
        }
        self.pages = page.pages;

        dedup_by_id(&mut self.messages);
        self.messages.sort_by_key(|m| m.timestamp);

        SeedOutcome::Applied
    }

    // -- live merge ---------------------------------------------------------

    /// Merge a pushed message: append to the visible list when it belongs to
    /// the active chat, update the chat's last message and ordering, and
    /// bump the unread counter per the viewing rule.
    pub fn apply_incoming_message(&mut self, msg: Message) {
        if msg.id.is_empty() || msg.chat_id.is_empty() {
            tracing::debug!("Dropping malformed incoming message");
            return;
        }

        let is_active = self.active_chat_id.as_deref() == Some(msg.chat_id.as_str());
        if is_active {
            self.insert_message(msg.clone());
        }

        // Increment unless the chat is being viewed; own messages never count.
        let increment = !is_active && msg.user_id != self.current_user_id;
        self.promote_chat(msg, increment);
    }

    /// Append a locally-originated send before server confirmation.
    pub fn apply_optimistic_send(&mut self, msg: Message) {
        debug_assert_eq!(msg.status, Delivery::Pending);

        if self.active_chat_id.as_deref() == Some(msg.chat_id.as_str()) {
            self.insert_message(msg.clone());
        }
        self.promote_chat(msg, false);
    }

    /// Replace a pending record with the server-canonical one, in place.
    ///
    /// If the canonical id is already present (the push event beat the REST
    /// response), the pending record is removed instead of duplicated.
    pub fn confirm_send(&mut self, local_id: &str, mut canonical: Message) {
        canonical.status = Delivery::Confirmed;

        if let Some(pos) = self.messages.iter().position(|m| m.id == local_id) {
            let already_present = self
                .messages
                .iter()
                .any(|m| m.id == canonical.id && m.id != local_id);
            if already_present {
                self.messages.remove(pos);
            } else {
                self.messages[pos] = canonical.clone();
            }
        }

        if let Some(chat) = self.chats.iter_mut().find(|c| c.id == canonical.chat_id) {
            if let Some(ref last) = chat.last_message {
                if last.id == local_id {
                    chat.last_message = Some(canonical);
                }
            }
        }
    }

    /// Remove a pending record after a failed send.
    pub fn rollback_send(&mut self, local_id: &str) {
        let chat_id = match self.messages.iter().find(|m| m.id == local_id) {
            Some(m) => m.chat_id.clone(),
            None => return,
        };
        self.messages.retain(|m| m.id != local_id);
        self.restore_last_message(&chat_id, local_id);
        self.sort_chats();
    }

    /// Update presence fields of the matching member in every chat.
    pub fn apply_presence(&mut self, user_id: &str, online: bool, last_seen: Option<DateTime<Utc>>) {
        for chat in &mut self.chats {
            for member in &mut chat.members {
                if member.id == user_id {
                    member.is_online = online;
                    if let Some(seen) = last_seen {
                        member.last_seen = Some(seen);
                    }
                }
            }
        }
    }

    // -- command support ----------------------------------------------------

    /// Insert a freshly created chat at the top, replacing any stale copy.
    pub fn insert_chat(&mut self, chat: Chat) {
        self.chats.retain(|c| c.id != chat.id);
        self.chats.insert(0, chat);
        self.sort_chats();
    }

    /// Replace a chat in place (membership or rename from REST).
    pub fn replace_chat(&mut self, chat: Chat) {
        match self.chats.iter_mut().find(|c| c.id == chat.id) {
            Some(slot) => *slot = chat,
            None => self.insert_chat(chat),
        }
    }

    /// `is_read` transitions false to true only.
    pub fn mark_message_read(&mut self, message_id: &str) {
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == message_id) {
            msg.is_read = true;
        }
    }

    /// Remove a message ahead of a delete call. Returns its position and the
    /// record so a failed delete can restore it.
    pub fn remove_message(&mut self, message_id: &str) -> Option<(usize, Message)> {
        let pos = self.messages.iter().position(|m| m.id == message_id)?;
        let msg = self.messages.remove(pos);
        self.restore_last_message(&msg.chat_id, message_id);
        Some((pos, msg))
    }

    /// Undo a `remove_message` after a failed delete.
    pub fn restore_message(&mut self, pos: usize, msg: Message) {
        let chat_id = msg.chat_id.clone();
        let pos = pos.min(self.messages.len());
        self.messages.insert(pos, msg.clone());
        if self.active_chat_id.as_deref() == Some(chat_id.as_str()) {
            if let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) {
                let newer = chat
                    .last_message
                    .as_ref()
                    .map(|last| last.timestamp >= msg.timestamp)
                    .unwrap_or(false);
                if !newer {
                    chat.last_message = Some(msg);
                }
            }
        }
    }

    // -- internals ----------------------------------------------------------

    fn sort_chats(&mut self) {
        // Stable sort: equal activity keeps current relative order.
        self.chats
            .sort_by(|a, b| b.activity_at().cmp(&a.activity_at()));
    }

    fn clear_unread(&mut self, chat_id: &str) {
        if let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) {
            chat.unread_count = 0;
        }
    }

    /// Insert into the visible list keeping it deduplicated and ascending.
    /// Equal timestamps insert after existing entries (arrival order).
    fn insert_message(&mut self, msg: Message) {
        if self.messages.iter().any(|m| m.id == msg.id) {
            return;
        }
        let pos = self
            .messages
            .partition_point(|m| m.timestamp <= msg.timestamp);
        self.messages.insert(pos, msg);
    }

    /// Set the chat's last message, optionally bump unread, move it first.
    fn promote_chat(&mut self, msg: Message, increment_unread: bool) {
        let pos = match self.chats.iter().position(|c| c.id == msg.chat_id) {
            Some(pos) => pos,
            None => {
                tracing::debug!("Message for unknown chat {}", msg.chat_id);
                return;
            }
        };

        let mut chat = self.chats.remove(pos);
        if increment_unread {
            chat.unread_count += 1;
        }
        chat.last_message = Some(msg);
        self.chats.insert(0, chat);
    }

    /// Recompute a chat's denormalized last message after a local removal.
    fn restore_last_message(&mut self, chat_id: &str, removed_id: &str) {
        let replacement = if self.active_chat_id.as_deref() == Some(chat_id) {
            self.messages.last().cloned()
        } else {
            None
        };
        if let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) {
            let was_last = chat
                .last_message
                .as_ref()
                .map(|m| m.id == removed_id)
                .unwrap_or(false);
            if was_last {
                chat.last_message = replacement;
            }
        }
    }
}

/// Drop later duplicates by id, keeping the first occurrence.
fn dedup_by_id(messages: &mut Vec<Message>) {
    let mut seen = HashSet::new();
    messages.retain(|m| seen.insert(m.id.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn msg(id: &str, chat_id: &str, user_id: &str, secs: i64) -> Message {
        Message {
            id: id.to_string(),
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            content: format!("msg {}", id),
            timestamp: ts(secs),
            is_read: false,
            author: None,
            status: Delivery::Confirmed,
        }
    }

    fn chat(id: &str, last: Option<Message>) -> Chat {
        Chat {
            id: id.to_string(),
            name: id.to_string(),
            is_group: false,
            created_at: ts(0),
            created_by_id: "me".to_string(),
            members: Vec::new(),
            last_message: last,
            unread_count: 0,
        }
    }

    fn page(page_no: u32, pages: u32, messages: Vec<Message>) -> MessagePage {
        MessagePage {
            total: messages.len() as u32,
            messages,
            pages,
            page: page_no,
        }
    }

    fn store_with_active(chat_id: &str) -> ChatStore {
        let mut store = ChatStore::new("me".to_string());
        store.seed_chats(vec![chat(chat_id, None)]);
        store.set_active_chat(Some(chat_id.to_string()));
        store
    }

    fn ids(store: &ChatStore) -> Vec<String> {
        store.messages().iter().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn page_merges_stay_deduped_and_ordered() {
        let mut store = store_with_active("c1");

        let first = page(1, 3, vec![msg("m5", "c1", "u1", 50), msg("m6", "c1", "u1", 60)]);
        assert_eq!(store.seed_messages("c1", first), SeedOutcome::Applied);

        // Older page, arrives out of order within itself and overlaps m5.
        let older = page(
            2,
            3,
            vec![msg("m4", "c1", "u1", 40), msg("m3", "c1", "u1", 30), msg("m5", "c1", "u1", 50)],
        );
        assert_eq!(store.seed_messages("c1", older), SeedOutcome::Applied);

        assert_eq!(ids(&store), vec!["m3", "m4", "m5", "m6"]);
        let times: Vec<_> = store.messages().iter().map(|m| m.timestamp).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert!(store.has_more_pages());
        assert_eq!(store.current_page(), 2);
    }

    #[test]
    fn duplicate_incoming_message_is_idempotent() {
        let mut store = store_with_active("c1");
        let m = msg("m1", "c1", "u1", 10);

        store.apply_incoming_message(m.clone());
        let snapshot = ids(&store);
        store.apply_incoming_message(m);

        assert_eq!(ids(&store), snapshot);
        assert_eq!(store.chat("c1").unwrap().unread_count, 0);
    }

    #[test]
    fn optimistic_send_reconciles_in_place() {
        let mut store = store_with_active("c1");
        store.apply_incoming_message(msg("m1", "c1", "u2", 10));
        store.apply_incoming_message(msg("m2", "c1", "u2", 20));

        let pending = Message {
            status: Delivery::Pending,
            ..msg("local-1", "c1", "me", 30)
        };
        store.apply_optimistic_send(pending);
        assert_eq!(ids(&store), vec!["m1", "m2", "local-1"]);

        let canonical = msg("m3", "c1", "me", 30);
        store.confirm_send("local-1", canonical);

        assert_eq!(ids(&store), vec!["m1", "m2", "m3"]);
        assert_eq!(store.messages()[2].status, Delivery::Confirmed);
        assert_eq!(
            store.chat("c1").unwrap().last_message.as_ref().unwrap().id,
            "m3"
        );
    }

    #[test]
    fn confirm_after_push_race_leaves_one_copy() {
        let mut store = store_with_active("c1");
        let pending = Message {
            status: Delivery::Pending,
            ..msg("local-1", "c1", "me", 30)
        };
        store.apply_optimistic_send(pending);
        // The push event for our own send arrives before the REST response.
        store.apply_incoming_message(msg("m3", "c1", "me", 30));
        store.confirm_send("local-1", msg("m3", "c1", "me", 30));

        assert_eq!(ids(&store), vec!["m3"]);
    }

    #[test]
    fn rollback_removes_pending_record() {
        let mut store = store_with_active("c1");
        store.apply_incoming_message(msg("m1", "c1", "u2", 10));
        let pending = Message {
            status: Delivery::Pending,
            ..msg("local-1", "c1", "me", 30)
        };
        store.apply_optimistic_send(pending);

        store.rollback_send("local-1");

        assert_eq!(ids(&store), vec!["m1"]);
        assert_eq!(
            store.chat("c1").unwrap().last_message.as_ref().unwrap().id,
            "m1"
        );
    }

    #[test]
    fn activating_a_chat_clears_unread() {
        let mut store = ChatStore::new("me".to_string());
        let mut c = chat("c1", None);
        c.unread_count = 7;
        store.seed_chats(vec![c]);

        store.set_active_chat(Some("c1".to_string()));

        assert_eq!(store.chat("c1").unwrap().unread_count, 0);
    }

    #[test]
    fn seed_chats_sorts_descending_by_last_activity() {
        let mut store = ChatStore::new("me".to_string());

        // Snapshot arrives out of order; c3 has no messages and falls back
        // to its creation time.
        let mut quiet = chat("c3", None);
        quiet.created_at = ts(7);
        store.seed_chats(vec![
            chat("c2", Some(msg("b", "c2", "u1", 5))),
            quiet,
            chat("c1", Some(msg("a", "c1", "u1", 10))),
        ]);

        let order: Vec<_> = store.chats().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["c1", "c3", "c2"]);
    }

    #[test]
    fn incoming_message_reorders_chats_and_counts_unread() {
        let mut store = ChatStore::new("me".to_string());
        store.seed_chats(vec![
            chat("c1", Some(msg("a", "c1", "u1", 10))),
            chat("c2", Some(msg("b", "c2", "u1", 5))),
        ]);
        let order: Vec<_> = store.chats().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["c1", "c2"]);

        store.apply_incoming_message(msg("m9", "c2", "u1", 20));

        let order: Vec<_> = store.chats().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["c2", "c1"]);
        assert_eq!(store.chat("c2").unwrap().unread_count, 1);
        assert_eq!(
            store.chat("c2").unwrap().last_message.as_ref().unwrap().id,
            "m9"
        );
    }

    #[test]
    fn active_chat_never_accumulates_unread() {
        let mut store = store_with_active("c1");

        // Self-authored.
        store.apply_incoming_message(msg("m1", "c1", "me", 10));
        assert_eq!(store.chat("c1").unwrap().unread_count, 0);

        // Someone else, but the chat is being viewed.
        store.apply_incoming_message(msg("m2", "c1", "u2", 20));
        assert_eq!(store.chat("c1").unwrap().unread_count, 0);
    }

    #[test]
    fn stale_message_page_is_discarded() {
        let mut store = ChatStore::new("me".to_string());
        store.seed_chats(vec![chat("c1", None), chat("c2", None)]);
        store.set_active_chat(Some("c1".to_string()));
        store.set_active_chat(Some("c2".to_string()));

        // The fetch issued for c1 resolves after the switch.
        let late = page(1, 1, vec![msg("m1", "c1", "u1", 10)]);
        assert_eq!(store.seed_messages("c1", late), SeedOutcome::Stale);
        assert!(store.messages().is_empty());
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let mut store = store_with_active("c1");
        store.apply_incoming_message(msg("m1", "c1", "u1", 10));
        store.apply_incoming_message(msg("m2", "c1", "u2", 10));
        store.apply_incoming_message(msg("m3", "c1", "u1", 10));

        assert_eq!(ids(&store), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn presence_updates_members_everywhere() {
        let user = crate::models::User {
            id: "u1".to_string(),
            username: "u1".to_string(),
            display_name: "U One".to_string(),
            avatar_path: None,
            is_admin: false,
            is_active: true,
            is_online: false,
            last_seen: None,
        };
        let mut c1 = chat("c1", None);
        c1.members = vec![user.clone()];
        let mut c2 = chat("c2", None);
        c2.members = vec![user];

        let mut store = ChatStore::new("me".to_string());
        store.seed_chats(vec![c1, c2]);

        store.apply_presence("u1", true, Some(ts(99)));

        for chat in store.chats() {
            assert!(chat.members[0].is_online);
            assert_eq!(chat.members[0].last_seen, Some(ts(99)));
        }
    }

    #[test]
    fn message_for_unknown_chat_is_a_noop() {
        let mut store = store_with_active("c1");
        store.apply_incoming_message(msg("m1", "zzz", "u1", 10));
        assert!(store.messages().is_empty());
        assert_eq!(store.chats().len(), 1);
    }

    #[test]
    fn own_typing_events_are_ignored() {
        let mut store = store_with_active("c1");
        let now = Instant::now();
        store.apply_event(
            ClientEvent::TypingChanged {
                chat_id: "c1".to_string(),
                user_id: "me".to_string(),
                is_typing: true,
            },
            now,
        );
        store.apply_event(
            ClientEvent::TypingChanged {
                chat_id: "c1".to_string(),
                user_id: "u2".to_string(),
                is_typing: true,
            },
            now,
        );

        assert_eq!(store.typists(now), vec!["u2".to_string()]);
    }

    #[test]
    fn disconnect_clears_connection_and_typing_state() {
        let mut store = store_with_active("c1");
        let now = Instant::now();
        store.apply_event(ClientEvent::Connected, now);
        assert!(store.is_connected());
        store.apply_event(
            ClientEvent::TypingChanged {
                chat_id: "c1".to_string(),
                user_id: "u2".to_string(),
                is_typing: true,
            },
            now,
        );

        store.apply_event(ClientEvent::Disconnected, now);

        assert!(!store.is_connected());
        assert!(store.typists(now).is_empty());
    }

    #[test]
    fn delete_and_restore_round_trip() {
        let mut store = store_with_active("c1");
        store.apply_incoming_message(msg("m1", "c1", "u2", 10));
        store.apply_incoming_message(msg("m2", "c1", "u2", 20));

        let (pos, removed) = store.remove_message("m2").unwrap();
        assert_eq!(ids(&store), vec!["m1"]);
        assert_eq!(
            store.chat("c1").unwrap().last_message.as_ref().unwrap().id,
            "m1"
        );

        store.restore_message(pos, removed);
        assert_eq!(ids(&store), vec!["m1", "m2"]);
        assert_eq!(
            store.chat("c1").unwrap().last_message.as_ref().unwrap().id,
            "m2"
        );
    }
}
