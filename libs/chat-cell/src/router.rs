// libs/chat-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::handlers;
use crate::services::PresenceRegistry;

/// Shared state for every chat socket: the process-wide presence map plus
/// the storage client used by delivery.
#[derive(Clone)]
pub struct ChatState {
    pub config: Arc<AppConfig>,
    pub supabase: Arc<SupabaseClient>,
    pub presence: PresenceRegistry,
}

impl ChatState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(&config)),
            config,
            presence: PresenceRegistry::new(),
        }
    }
}

pub fn chat_routes(state: ChatState) -> Router {
    Router::new()
        .route("/ws/chat", get(handlers::ws_handler))
        .with_state(state)
}
