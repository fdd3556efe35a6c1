//! Outbound command gateway
//!
//! Wraps every user-initiated action as: optimistic store mutation where
//! applicable, then the REST call, then reconcile on success or roll back on
//! failure. Transport side effects (typing signals, read receipts) ride on
//! the socket's outbound channel and are best-effort.

use tokio::sync::mpsc;

use super::error::SyncError;
use super::store::{ChatStore, SeedOutcome};
use crate::api::{self, client::ApiClient};
use crate::models::{Chat, Message};
use crate::socket::OutboundEvent;

/// Messages fetched per history page.
pub const MESSAGES_PER_PAGE: u32 = 20;

pub struct CommandGateway {
    api: ApiClient,
    /// Present while the socket is running; `None` in offline commands.
    outbound: Option<mpsc::UnboundedSender<OutboundEvent>>,
}

impl CommandGateway {
    pub fn new(api: ApiClient, outbound: Option<mpsc::UnboundedSender<OutboundEvent>>) -> Self {
        Self { api, outbound }
    }

    fn request_failed(e: anyhow::Error) -> SyncError {
        SyncError::RequestFailure(format!("{:#}", e))
    }

    /// Best-effort transport signal; dropped silently when disconnected.
    fn signal(&self, event: OutboundEvent) {
        if let Some(ref tx) = self.outbound {
            let _ = tx.send(event);
        }
    }

    /// Signal that the current user started or stopped typing.
    pub fn signal_typing(&self, chat_id: &str, is_typing: bool) {
        self.signal(OutboundEvent::Typing {
            chat_id: chat_id.to_string(),
            is_typing,
        });
    }

    /// Re-fetch the chat list and seed the store.
    pub async fn refresh_chats(&self, store: &mut ChatStore) -> Result<(), SyncError> {
        store.set_loading(true);
        let result = api::list_chats_data(&self.api).await;
        store.set_loading(false);

        let chats = result.map_err(Self::request_failed)?;
        store.seed_chats(chats);
        Ok(())
    }

    /// Switch the active chat and fetch its first message page.
    ///
    /// The fetched page is applied through the store's stale guard, so a
    /// result arriving after another switch is discarded, not merged.
    pub async fn open_chat(
        &self,
        store: &mut ChatStore,
        chat_id: Option<String>,
    ) -> Result<(), SyncError> {
        store.set_active_chat(chat_id.clone());
        let chat_id = match chat_id {
            Some(id) => id,
            None => return Ok(()),
        };

        store.set_loading(true);
        let result = api::get_messages_data(&self.api, &chat_id, 1, MESSAGES_PER_PAGE).await;
        store.set_loading(false);

        let page = result.map_err(Self::request_failed)?;
        store.seed_messages(&chat_id, page);
        Ok(())
    }

    /// Fetch the next (older) history page. Returns whether anything new
    /// was merged.
    pub async fn load_older_messages(&self, store: &mut ChatStore) -> Result<bool, SyncError> {
        let chat_id = match store.active_chat_id() {
            Some(id) if store.has_more_pages() => id.to_string(),
            _ => return Ok(false),
        };
        let next_page = store.current_page() + 1;

        store.set_loading(true);
        let result = api::get_messages_data(&self.api, &chat_id, next_page, MESSAGES_PER_PAGE).await;
        store.set_loading(false);

        let page = result.map_err(Self::request_failed)?;
        let got_any = !page.messages.is_empty();
        match store.seed_messages(&chat_id, page) {
            SeedOutcome::Applied => Ok(got_any),
            SeedOutcome::Stale => Ok(false),
        }
    }

    /// Send a message to the active chat: optimistic append, REST call,
    /// reconcile or roll back. Also signals stopped-typing.
    pub async fn send_message(
        &self,
        store: &mut ChatStore,
        content: &str,
    ) -> Result<Message, SyncError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SyncError::RequestFailure("empty message".to_string()));
        }
        let chat_id = store
            .active_chat_id()
            .ok_or_else(|| SyncError::NotFound("active chat".to_string()))?
            .to_string();

        let pending = Message::pending(&chat_id, store.current_user_id(), content);
        let local_id = pending.id.clone();
        store.apply_optimistic_send(pending);

        self.signal_typing(&chat_id, false);

        match api::send_message_data(&self.api, &chat_id, content).await {
            Ok(canonical) => {
                store.confirm_send(&local_id, canonical.clone());
                Ok(canonical)
            }
            Err(e) => {
                store.rollback_send(&local_id);
                Err(Self::request_failed(e))
            }
        }
    }

    /// Create a chat and put it at the top of the list.
    pub async fn create_chat(
        &self,
        store: &mut ChatStore,
        member_ids: &[String],
        name: Option<&str>,
    ) -> Result<Chat, SyncError> {
        let chat = api::create_chat_data(&self.api, member_ids, name)
            .await
            .map_err(Self::request_failed)?;
        store.insert_chat(chat.clone());
        Ok(chat)
    }

    /// Mark a message read, server-side and locally, and emit the receipt.
    pub async fn mark_read(&self, store: &mut ChatStore, message_id: &str) -> Result<(), SyncError> {
        api::mark_read_data(&self.api, message_id)
            .await
            .map_err(Self::request_failed)?;
        store.mark_message_read(message_id);
        self.signal(OutboundEvent::ReadReceipt {
            message_id: message_id.to_string(),
        });
        Ok(())
    }

    /// Delete a message: optimistic removal, restored if the call fails.
    pub async fn delete_message(
        &self,
        store: &mut ChatStore,
        message_id: &str,
    ) -> Result<(), SyncError> {
        let removed = store.remove_message(message_id);

        match api::delete_message_data(&self.api, message_id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Some((pos, msg)) = removed {
                    store.restore_message(pos, msg);
                }
                Err(Self::request_failed(e))
            }
        }
    }

    /// Rename a group chat; the server returns the updated chat.
    pub async fn rename_chat(
        &self,
        store: &mut ChatStore,
        chat_id: &str,
        name: &str,
    ) -> Result<Chat, SyncError> {
        let chat = api::update_chat_data(&self.api, chat_id, name)
            .await
            .map_err(Self::request_failed)?;
        store.replace_chat(chat.clone());
        Ok(chat)
    }

    /// Add members to a chat; the server returns the updated chat.
    pub async fn add_members(
        &self,
        store: &mut ChatStore,
        chat_id: &str,
        member_ids: &[String],
    ) -> Result<(), SyncError> {
        let chat = api::add_members_data(&self.api, chat_id, member_ids)
            .await
            .map_err(Self::request_failed)?;
        store.replace_chat(chat);
        Ok(())
    }

    /// Remove one member from a chat.
    pub async fn remove_member(
        &self,
        store: &mut ChatStore,
        chat_id: &str,
        member_id: &str,
    ) -> Result<(), SyncError> {
        let chat = api::remove_member_data(&self.api, chat_id, member_id)
            .await
            .map_err(Self::request_failed)?;
        store.replace_chat(chat);
        Ok(())
    }
}
