// libs/chat-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::supabase::SupabaseError;

/// Stable identifier for the message thread between two users, independent
/// of who writes first: the sorted pair joined with an underscore.
pub fn conversation_id(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}_{}", a, b)
    } else {
        format!("{}_{}", b, a)
    }
}

/// A connected user as shown in presence rosters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatParticipant {
    pub id: String,
    pub username: String,
}

/// Storage row in chat_messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRecord {
    pub id: Uuid,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub conversation_id: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Wire shape of a delivered message; both parties are carried with their
/// display names so clients render without extra lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageView {
    pub id: Uuid,
    pub sender: ChatParticipant,
    pub receiver: ChatParticipant,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub conversation_id: String,
    pub read: bool,
}

impl ChatMessageView {
    pub fn from_record(
        record: ChatMessageRecord,
        sender: ChatParticipant,
        receiver: ChatParticipant,
    ) -> Self {
        Self {
            id: record.id,
            sender,
            receiver,
            message: record.message,
            timestamp: record.created_at,
            conversation_id: record.conversation_id,
            read: record.read,
        }
    }
}

/// Server-to-client frames. Tagged as {"type": ..., "payload": ...}.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerEvent {
    ActiveUserList(Vec<ChatParticipant>),
    UserJoined(ChatParticipant),
    #[serde(rename_all = "camelCase")]
    UserLeft { user_id: String },
    NewMessage(ChatMessageView),
    Error(String),
    Info(String),
}

/// Client-to-server frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    pub receiver_id: String,
    pub text: String,
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Storage error: {0}")]
    Database(String),

    #[error("Recipient lookup failed: {0}")]
    Lookup(String),

    #[error("Recipient not found")]
    ReceiverNotFound,

    #[error("{0}")]
    Validation(String),
}

impl From<SupabaseError> for ChatError {
    fn from(err: SupabaseError) -> Self {
        ChatError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_is_order_independent() {
        assert_eq!(conversation_id("alice", "bob"), conversation_id("bob", "alice"));
        assert_eq!(conversation_id("alice", "bob"), "alice_bob");
    }

    #[test]
    fn conversation_with_self_is_stable() {
        assert_eq!(conversation_id("alice", "alice"), "alice_alice");
    }

    #[test]
    fn server_events_use_tagged_envelope() {
        let event = ServerEvent::UserJoined(ChatParticipant {
            id: "u1".into(),
            username: "alice".into(),
        });
        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["type"], "userJoined");
        assert_eq!(encoded["payload"]["username"], "alice");
    }

    #[test]
    fn user_left_carries_only_the_user_id() {
        let event = ServerEvent::UserLeft {
            user_id: "u1".into(),
        };
        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["type"], "userLeft");
        assert_eq!(encoded["payload"], serde_json::json!({ "userId": "u1" }));
    }

    #[test]
    fn error_payload_is_a_bare_string() {
        let event = ServerEvent::Error("nope".into());
        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["payload"], "nope");
    }

    #[test]
    fn client_message_uses_camel_case() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"receiverId":"u2","text":"hi"}"#).unwrap();
        assert_eq!(msg.receiver_id, "u2");
        assert_eq!(msg.text, "hi");
    }
}
