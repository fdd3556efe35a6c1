//! REST API client module for LokalChat

pub mod chat;
pub mod client;
pub mod user;

pub use chat::{
    add_members_data, create_chat_data, delete_message_data, get_messages_data, list_chats_data,
    mark_read_data, remove_member_data, send_message_data, update_chat_data,
};
