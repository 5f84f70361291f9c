// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/", get(handlers::list_appointments))
        .route("/my", get(handlers::my_appointments))
        .route("/doctor/me", get(handlers::doctor_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", put(handlers::update_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .route(
            "/{appointment_id}/status",
            patch(handlers::update_appointment_status),
        )
        .route(
            "/{appointment_id}/cancel",
            patch(handlers::cancel_appointment),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}

/// Availability is a public lookup: prospective patients check a doctor's
/// openings before they have an account.
pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/{doctor_id}/availability",
            get(handlers::get_doctor_availability),
        )
        .with_state(state)
}
