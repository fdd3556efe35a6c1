//! Event normalization: raw socket frames to typed domain events
//!
//! The wire format is one JSON object per text frame:
//! `{"event": "<name>", "data": {...}}`. Inbound names are `new_message`,
//! `user_status` and `user_typing`; anything else is dropped without error.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::Message;

/// Typed domain event handed to the sync store.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Transport established (initial connect or successful reconnect).
    Connected,
    /// Transport lost; a reconnect may follow.
    Disconnected,
    MessageReceived(Message),
    PresenceChanged {
        user_id: String,
        online: bool,
        last_seen: Option<DateTime<Utc>>,
    },
    TypingChanged {
        chat_id: String,
        user_id: String,
        is_typing: bool,
    },
}

/// Commands sent out over the transport.
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    Typing { chat_id: String, is_typing: bool },
    Message { chat_id: String, content: String },
    ReadReceipt { message_id: String },
}

impl OutboundEvent {
    /// Encode as a wire frame.
    pub fn to_frame(&self) -> String {
        let value = match self {
            OutboundEvent::Typing { chat_id, is_typing } => serde_json::json!({
                "event": "typing",
                "data": { "chat_id": chat_id, "is_typing": is_typing },
            }),
            OutboundEvent::Message { chat_id, content } => serde_json::json!({
                "event": "message",
                "data": { "chat_id": chat_id, "content": content },
            }),
            OutboundEvent::ReadReceipt { message_id } => serde_json::json!({
                "event": "read_message",
                "data": { "message_id": message_id },
            }),
        };
        value.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    user_id: String,
    status: String,
    #[serde(default)]
    last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TypingPayload {
    chat_id: String,
    user_id: String,
    is_typing: bool,
}

/// Translate one raw text frame into a domain event.
///
/// Returns `None` for unknown event names and malformed payloads; arrival
/// order of the frames that do translate is preserved by the caller.
pub fn normalize(frame: &str) -> Option<ClientEvent> {
    let raw: RawFrame = match serde_json::from_str(frame) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!("Dropping malformed socket frame: {}", e);
            return None;
        }
    };

    match raw.event.as_str() {
        "new_message" => match serde_json::from_value::<Message>(raw.data) {
            Ok(msg) => Some(ClientEvent::MessageReceived(msg)),
            Err(e) => {
                tracing::debug!("Dropping malformed new_message payload: {}", e);
                None
            }
        },
        "user_status" => match serde_json::from_value::<StatusPayload>(raw.data) {
            Ok(p) => Some(ClientEvent::PresenceChanged {
                user_id: p.user_id,
                online: p.status == "online",
                last_seen: p.last_seen,
            }),
            Err(e) => {
                tracing::debug!("Dropping malformed user_status payload: {}", e);
                None
            }
        },
        "user_typing" => match serde_json::from_value::<TypingPayload>(raw.data) {
            Ok(p) => Some(ClientEvent::TypingChanged {
                chat_id: p.chat_id,
                user_id: p.user_id,
                is_typing: p.is_typing,
            }),
            Err(e) => {
                tracing::debug!("Dropping malformed user_typing payload: {}", e);
                None
            }
        },
        other => {
            tracing::debug!("Ignoring unknown socket event '{}'", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_new_message() {
        let frame = r#"{"event":"new_message","data":{
            "id":"m1","chat_id":"c1","user_id":"u1","content":"hi",
            "timestamp":"2026-01-01T10:00:00Z","is_read":false}}"#;
        match normalize(frame) {
            Some(ClientEvent::MessageReceived(msg)) => {
                assert_eq!(msg.id, "m1");
                assert_eq!(msg.chat_id, "c1");
                assert_eq!(msg.status, crate::models::Delivery::Confirmed);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn normalizes_user_status() {
        let frame = r#"{"event":"user_status","data":{
            "user_id":"u2","status":"online","last_seen":"2026-01-01T10:00:00Z"}}"#;
        match normalize(frame) {
            Some(ClientEvent::PresenceChanged { user_id, online, last_seen }) => {
                assert_eq!(user_id, "u2");
                assert!(online);
                assert!(last_seen.is_some());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn normalizes_user_typing() {
        let frame = r#"{"event":"user_typing","data":{
            "chat_id":"c1","user_id":"u2","is_typing":true}}"#;
        match normalize(frame) {
            Some(ClientEvent::TypingChanged { chat_id, user_id, is_typing }) => {
                assert_eq!(chat_id, "c1");
                assert_eq!(user_id, "u2");
                assert!(is_typing);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn unknown_event_names_are_dropped() {
        assert!(normalize(r#"{"event":"server_notice","data":{}}"#).is_none());
    }

    #[test]
    fn malformed_frames_are_dropped() {
        assert!(normalize("not json").is_none());
        assert!(normalize(r#"{"event":"new_message","data":{"id":42}}"#).is_none());
    }

    #[test]
    fn outbound_frames_carry_wire_names() {
        let frame = OutboundEvent::Typing {
            chat_id: "c1".into(),
            is_typing: false,
        }
        .to_frame();
        let v: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(v["event"], "typing");
        assert_eq!(v["data"]["chat_id"], "c1");
        assert_eq!(v["data"]["is_typing"], false);

        let frame = OutboundEvent::ReadReceipt {
            message_id: "m9".into(),
        }
        .to_frame();
        let v: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(v["event"], "read_message");
        assert_eq!(v["data"]["message_id"], "m9");
    }
}
