// libs/chat-cell/src/services/presence.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{ChatParticipant, ServerEvent};

/// Close code for a token that is missing or fails validation.
pub const CLOSE_TOKEN_INVALID: u16 = 4401;
/// Close code when the token is valid but the user record is gone.
pub const CLOSE_USER_NOT_FOUND: u16 = 4404;
/// Close code sent to an older connection replaced by a newer one.
pub const CLOSE_SUPERSEDED: u16 = 4001;

/// A frame queued for one connection's writer task.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

struct PresenceEntry {
    conn_id: Uuid,
    username: String,
    tx: UnboundedSender<OutboundFrame>,
}

/// One-connection-per-user presence map shared by every socket task.
///
/// Each registration gets a fresh connection id; deregistration only
/// removes the entry when the id still matches, so a superseded socket
/// tearing down late cannot evict its replacement.
#[derive(Clone)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<HashMap<String, PresenceEntry>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a connection for `user_id`, superseding any previous one.
    /// The old connection is told to close with `CLOSE_SUPERSEDED`.
    pub async fn register(
        &self,
        user_id: &str,
        username: &str,
        tx: UnboundedSender<OutboundFrame>,
    ) -> Uuid {
        let conn_id = Uuid::new_v4();
        let mut map = self.inner.write().await;

        if let Some(old) = map.insert(
            user_id.to_string(),
            PresenceEntry {
                conn_id,
                username: username.to_string(),
                tx,
            },
        ) {
            debug!("Superseding connection {} for user {}", old.conn_id, user_id);
            let _ = old.tx.send(OutboundFrame::Close {
                code: CLOSE_SUPERSEDED,
                reason: "Connected from another session".to_string(),
            });
        }

        conn_id
    }

    /// Remove the user's entry if `conn_id` is still the connection of
    /// record. Returns whether an entry was removed.
    pub async fn deregister(&self, user_id: &str, conn_id: Uuid) -> bool {
        let mut map = self.inner.write().await;
        match map.get(user_id) {
            Some(entry) if entry.conn_id == conn_id => {
                map.remove(user_id);
                true
            }
            _ => false,
        }
    }

    pub async fn roster(&self) -> Vec<ChatParticipant> {
        let map = self.inner.read().await;
        let mut users: Vec<ChatParticipant> = map
            .iter()
            .map(|(id, entry)| ChatParticipant {
                id: id.clone(),
                username: entry.username.clone(),
            })
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.inner.read().await.contains_key(user_id)
    }

    /// Queue an event for one user. Returns false when the user is offline
    /// or their writer task has already gone away.
    pub async fn send_to(&self, user_id: &str, event: &ServerEvent) -> bool {
        let Some(text) = encode(event) else {
            return false;
        };
        let map = self.inner.read().await;
        match map.get(user_id) {
            Some(entry) => entry.tx.send(OutboundFrame::Text(text)).is_ok(),
            None => false,
        }
    }

    pub async fn broadcast(&self, event: &ServerEvent) {
        self.broadcast_filtered(event, None).await;
    }

    pub async fn broadcast_except(&self, event: &ServerEvent, skip_user_id: &str) {
        self.broadcast_filtered(event, Some(skip_user_id)).await;
    }

    async fn broadcast_filtered(&self, event: &ServerEvent, skip_user_id: Option<&str>) {
        let Some(text) = encode(event) else {
            return;
        };
        let map = self.inner.read().await;
        for (id, entry) in map.iter() {
            if skip_user_id == Some(id.as_str()) {
                continue;
            }
            let _ = entry.tx.send(OutboundFrame::Text(text.clone()));
        }
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Could not encode server event: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn register_and_roster() {
        let registry = PresenceRegistry::new();
        let (tx, _rx) = unbounded_channel();
        registry.register("u1", "alice", tx).await;

        assert!(registry.is_online("u1").await);
        let roster = registry.roster().await;
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].username, "alice");
    }

    #[tokio::test]
    async fn second_connection_supersedes_first() {
        let registry = PresenceRegistry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();

        let first = registry.register("u1", "alice", tx1).await;
        let second = registry.register("u1", "alice", tx2).await;
        assert_ne!(first, second);

        // The first writer is told to shut down.
        let frame = rx1.recv().await.unwrap();
        assert_matches!(
            frame,
            OutboundFrame::Close { code, .. } if code == CLOSE_SUPERSEDED
        );

        // One roster entry, and only the new conn id may deregister it.
        assert_eq!(registry.roster().await.len(), 1);
        assert!(!registry.deregister("u1", first).await);
        assert!(registry.is_online("u1").await);
        assert!(registry.deregister("u1", second).await);
        assert!(!registry.is_online("u1").await);
    }

    #[tokio::test]
    async fn send_to_offline_user_reports_false() {
        let registry = PresenceRegistry::new();
        let event = ServerEvent::Info("hello".into());
        assert!(!registry.send_to("nobody", &event).await);
    }

    #[tokio::test]
    async fn broadcast_except_skips_the_origin() {
        let registry = PresenceRegistry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        registry.register("u1", "alice", tx1).await;
        registry.register("u2", "bob", tx2).await;

        let event = ServerEvent::Info("hello".into());
        registry.broadcast_except(&event, "u1").await;

        assert!(rx1.try_recv().is_err());
        assert_matches!(rx2.try_recv(), Ok(OutboundFrame::Text(_)));
    }
}
