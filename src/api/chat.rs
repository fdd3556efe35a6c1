//! Chat and message REST endpoints

use anyhow::{Context, Result};

use super::client::ApiClient;
use crate::models::{Chat, Message, MessagePage};

/// List the current user's chats.
pub async fn list_chats_data(client: &ApiClient) -> Result<Vec<Chat>> {
    let resp = client.get("/chats").await?;
    resp.json().await.context("Failed to parse chat list")
}

/// Fetch a single chat.
pub async fn get_chat_data(client: &ApiClient, chat_id: &str) -> Result<Chat> {
    let resp = client.get(&format!("/chats/{}", chat_id)).await?;
    resp.json().await.context("Failed to parse chat")
}

/// Create a chat (1:1 or group, depending on member count / name).
pub async fn create_chat_data(
    client: &ApiClient,
    member_ids: &[String],
    name: Option<&str>,
) -> Result<Chat> {
    let body = serde_json::json!({ "member_ids": member_ids, "name": name });
    let resp = client.post("/chats", &body).await?;
    resp.json().await.context("Failed to parse created chat")
}

/// Rename a group chat.
pub async fn update_chat_data(client: &ApiClient, chat_id: &str, name: &str) -> Result<Chat> {
    let body = serde_json::json!({ "name": name });
    let resp = client.put(&format!("/chats/{}", chat_id), &body).await?;
    resp.json().await.context("Failed to parse updated chat")
}

/// Add members to a chat. Returns the updated chat.
pub async fn add_members_data(
    client: &ApiClient,
    chat_id: &str,
    member_ids: &[String],
) -> Result<Chat> {
    let body = serde_json::json!({ "member_ids": member_ids });
    let resp = client
        .post(&format!("/chats/{}/members", chat_id), &body)
        .await?;
    resp.json().await.context("Failed to parse updated chat")
}

/// Remove one member from a chat. Returns the updated chat.
pub async fn remove_member_data(client: &ApiClient, chat_id: &str, member_id: &str) -> Result<Chat> {
    let resp = client
        .delete(&format!("/chats/{}/members/{}", chat_id, member_id))
        .await?;
    resp.json().await.context("Failed to parse updated chat")
}

/// Fetch one page of a chat's message history.
///
/// Page 1 is the newest messages; higher pages go further back.
pub async fn get_messages_data(
    client: &ApiClient,
    chat_id: &str,
    page: u32,
    per_page: u32,
) -> Result<MessagePage> {
    let path = format!(
        "/chats/{}/messages?page={}&per_page={}",
        chat_id, page, per_page
    );
    let resp = client.get(&path).await?;
    resp.json().await.context("Failed to parse message page")
}

/// Send a message. Returns the server-canonical record.
pub async fn send_message_data(client: &ApiClient, chat_id: &str, content: &str) -> Result<Message> {
    let body = serde_json::json!({ "content": content });
    let resp = client
        .post(&format!("/chats/{}/messages", chat_id), &body)
        .await?;
    resp.json().await.context("Failed to parse sent message")
}

/// Upload a file into a chat. Returns the resulting message record.
pub async fn send_file_data(
    client: &ApiClient,
    chat_id: &str,
    path: &std::path::Path,
) -> Result<Message> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
    let form = reqwest::multipart::Form::new().part("file", part);

    let resp = client
        .post_multipart(&format!("/chats/{}/files", chat_id), form)
        .await?;
    resp.json().await.context("Failed to parse file message")
}

/// Mark one message as read.
pub async fn mark_read_data(client: &ApiClient, message_id: &str) -> Result<()> {
    client
        .put(
            &format!("/messages/{}/read", message_id),
            &serde_json::json!({}),
        )
        .await?;
    Ok(())
}

/// Delete one message.
pub async fn delete_message_data(client: &ApiClient, message_id: &str) -> Result<()> {
    client.delete(&format!("/messages/{}", message_id)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI-facing functions (print to stdout)
// ---------------------------------------------------------------------------

/// List recent chats (prints to stdout).
pub async fn list_chats(limit: usize) -> Result<()> {
    let client = ApiClient::new().await?;
    let chats = list_chats_data(&client).await?;

    println!("\nChats:");
    println!("{:-<60}", "");

    if chats.is_empty() {
        println!("  (no chats found)");
        return Ok(());
    }

    for chat in chats.iter().take(limit) {
        let kind = if chat.is_group { "group" } else { "1:1" };
        println!("{}  [{}]", chat.name, kind);
        println!("  ID: {}", chat.id);
        if chat.unread_count > 0 {
            println!("  Unread: {}", chat.unread_count);
        }
        if let Some(ref msg) = chat.last_message {
            let preview: String = msg.content.chars().take(77).collect();
            let suffix = if msg.content.chars().count() > 77 {
                "..."
            } else {
                ""
            };
            println!("  Last ({}): {}{}", msg.timestamp, preview, suffix);
        }
        println!();
    }

    Ok(())
}

/// Read messages from a chat (prints to stdout, oldest first).
pub async fn read_messages(chat_id: &str, limit: u32) -> Result<()> {
    let client = ApiClient::new().await?;
    let page = get_messages_data(&client, chat_id, 1, limit).await?;

    if page.messages.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    let mut messages = page.messages;
    messages.sort_by_key(|m| m.timestamp);

    for msg in &messages {
        let sender = msg
            .author
            .as_ref()
            .map(|a| a.label().to_string())
            .unwrap_or_else(|| msg.user_id.clone());
        println!("[{}] {}: {}", msg.timestamp, sender, msg.content);
    }

    Ok(())
}

/// Show one chat and its members.
pub async fn show_chat(chat_id: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    let chat = get_chat_data(&client, chat_id).await?;

    let kind = if chat.is_group { "group" } else { "1:1" };
    println!("\n{}  [{}]", chat.name, kind);
    println!("  ID: {}", chat.id);
    println!("  Created: {}", chat.created_at);
    println!("  Members:");
    for member in &chat.members {
        let presence = if member.is_online { "online" } else { "offline" };
        println!("    {} ({})  {}", member.label(), member.username, presence);
    }

    Ok(())
}

/// Send a message from the command line.
pub async fn send_message(chat_id: &str, content: &str) -> Result<()> {
    let client = ApiClient::new().await?;
    send_message_data(&client, chat_id, content).await?;
    println!("Message sent.");
    Ok(())
}

/// Send a file from the command line.
pub async fn send_file(chat_id: &str, path: &std::path::Path) -> Result<()> {
    let client = ApiClient::new().await?;
    send_file_data(&client, chat_id, path).await?;
    println!("File sent.");
    Ok(())
}
