// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AvailabilityQuery, CreateAppointmentRequest, UpdateAppointmentRequest,
    UpdateStatusRequest,
};
use crate::services::{AppointmentSchedulerService, AvailabilityService};

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let service = AppointmentSchedulerService::new(&state);
    let appointment = service.create(&user, request, auth.token()).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Admin-only listing of every appointment, newest first.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let service = AppointmentSchedulerService::new(&state);
    let appointments = service.list_all(&user, auth.token()).await?;
    Ok(Json(appointments))
}

/// Appointments booked for the calling patient's profile.
#[axum::debug_handler]
pub async fn my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let service = AppointmentSchedulerService::new(&state);
    let appointments = service.list_for_patient(&user, auth.token()).await?;
    Ok(Json(appointments))
}

/// Appointments on the calling doctor's schedule.
#[axum::debug_handler]
pub async fn doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let service = AppointmentSchedulerService::new(&state);
    let appointments = service.list_for_doctor(&user, auth.token()).await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let appointment_id = parse_path_uuid("appointment id", &appointment_id)?;
    let service = AppointmentSchedulerService::new(&state);
    let appointment = service
        .get_appointment_checked(&user, appointment_id, auth.token())
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment_id = parse_path_uuid("appointment id", &appointment_id)?;
    let service = AppointmentSchedulerService::new(&state);
    let appointment = service
        .update_status(&user, appointment_id, &request.status, auth.token())
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let appointment_id = parse_path_uuid("appointment id", &appointment_id)?;
    let service = AppointmentSchedulerService::new(&state);
    let appointment = service
        .cancel(&user, appointment_id, auth.token())
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment_id = parse_path_uuid("appointment id", &appointment_id)?;
    let service = AppointmentSchedulerService::new(&state);
    let appointment = service
        .update_full(&user, appointment_id, request, auth.token())
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment_id = parse_path_uuid("appointment id", &appointment_id)?;
    let service = AppointmentSchedulerService::new(&state);
    let appointment = service
        .delete(&user, appointment_id, auth.token())
        .await?;
    Ok(Json(json!({
        "message": "Appointment deleted",
        "id": appointment.id,
    })))
}

/// Public availability lookup, no authentication. Slots come back as
/// "HH:MM" labels for the requested UTC day.
#[axum::debug_handler]
pub async fn get_doctor_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    let doctor_id = parse_path_uuid("doctor id", &doctor_id)?;
    let date: NaiveDate = query.date.parse().map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid date format, expected YYYY-MM-DD: {}",
            query.date
        ))
    })?;

    let service = AvailabilityService::new(&state);
    let slots = service.available_slots(doctor_id, date).await?;
    Ok(Json(slots))
}

fn parse_path_uuid(what: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", what, raw)))
}
