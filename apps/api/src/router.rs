use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::{appointment_routes, availability_routes};
use chat_cell::router::{chat_routes, ChatState};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    // The chat cell keeps process-wide state (the presence map), built
    // once here and shared by every socket.
    let chat_state = ChatState::new(state.clone());

    Router::new()
        .route("/", get(|| async { "Clinio API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/doctors", availability_routes(state.clone()))
        .merge(chat_routes(chat_state))
}
