// libs/chat-cell/src/services/delivery.rs
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};

use uuid::Uuid;

use directory_cell::services::DirectoryService;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    conversation_id, ChatError, ChatMessageRecord, ChatMessageView, ChatParticipant,
    ClientMessage, ServerEvent,
};
use crate::services::presence::PresenceRegistry;

/// Persist-then-push message delivery.
///
/// Every message is stored first; only a stored row is pushed to the
/// recipient and echoed to the sender, so what both parties see is exactly
/// what history will replay. An offline recipient just means no push.
pub struct ChatDeliveryService {
    supabase: Arc<SupabaseClient>,
    directory: DirectoryService,
    presence: PresenceRegistry,
}

impl ChatDeliveryService {
    pub fn new(supabase: Arc<SupabaseClient>, presence: PresenceRegistry) -> Self {
        Self {
            directory: DirectoryService::with_client(Arc::clone(&supabase)),
            supabase,
            presence,
        }
    }

    /// Handle one raw text frame from the sender's socket. Failures are
    /// reported back on the sender's own connection as error frames; they
    /// never tear the socket down.
    pub async fn handle_incoming(&self, sender: &ChatParticipant, raw: &str, auth_token: &str) {
        let message = match serde_json::from_str::<ClientMessage>(raw) {
            Ok(message) => message,
            Err(_) => {
                self.report_error(&sender.id, "Malformed message, expected {receiverId, text}")
                    .await;
                return;
            }
        };

        match self.deliver(sender, message, auth_token).await {
            Ok(view) => {
                info!(
                    "Message {} delivered in conversation {}",
                    view.id, view.conversation_id
                );
            }
            Err(ChatError::Validation(reason)) => {
                self.report_error(&sender.id, &reason).await;
            }
            Err(ChatError::ReceiverNotFound) => {
                self.report_error(&sender.id, "Recipient not found").await;
            }
            Err(ChatError::Lookup(e)) => {
                warn!("Recipient lookup failed for {}: {}", sender.id, e);
                self.report_error(&sender.id, "Could not verify recipient")
                    .await;
            }
            Err(ChatError::Database(e)) => {
                warn!("Message from {} not delivered: {}", sender.id, e);
                self.report_error(&sender.id, "Message could not be saved")
                    .await;
            }
        }
    }

    async fn deliver(
        &self,
        sender: &ChatParticipant,
        message: ClientMessage,
        auth_token: &str,
    ) -> Result<ChatMessageView, ChatError> {
        let text = message.text.trim();
        if message.receiver_id.is_empty() || text.is_empty() {
            return Err(ChatError::Validation(
                "receiverId and text are both required".to_string(),
            ));
        }

        // The id goes straight into a storage filter; only a well-formed
        // uuid is allowed through.
        let receiver_id = Uuid::parse_str(&message.receiver_id)
            .map_err(|_| ChatError::Validation("receiverId must be a valid user id".to_string()))?
            .to_string();

        let receiver_account = self
            .directory
            .get_user_account(&receiver_id, Some(auth_token))
            .await
            .map_err(|e| ChatError::Lookup(e.to_string()))?
            .ok_or(ChatError::ReceiverNotFound)?;

        let record = self
            .persist(&sender.id, &receiver_id, text, auth_token)
            .await?;
        let receiver = ChatParticipant {
            id: receiver_id,
            username: receiver_account.username,
        };
        let view = ChatMessageView::from_record(record, sender.clone(), receiver);
        let event = ServerEvent::NewMessage(view.clone());

        // Push first, then echo; the sender's echo doubles as the ack.
        self.presence.send_to(&view.receiver.id, &event).await;
        self.presence.send_to(&sender.id, &event).await;

        Ok(view)
    }

    async fn persist(
        &self,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
        auth_token: &str,
    ) -> Result<ChatMessageRecord, ChatError> {
        let body = json!({
            "sender_id": sender_id,
            "receiver_id": receiver_id,
            "message": text,
            "conversation_id": conversation_id(sender_id, receiver_id),
            "read": false,
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let rows: Vec<ChatMessageRecord> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/chat_messages",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| ChatError::Database("Insert returned no row".to_string()))
    }

    async fn report_error(&self, user_id: &str, reason: &str) {
        let event = ServerEvent::Error(reason.to_string());
        self.presence.send_to(user_id, &event).await;
    }
}
