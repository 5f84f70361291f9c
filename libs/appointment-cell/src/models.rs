// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use directory_cell::models::DirectoryError;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appt_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Closed parse of the wire/status strings; anything else is an
    /// invalid argument, never a default.
    pub fn from_name(name: &str) -> Option<AppointmentStatus> {
        match name {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Booking request. Ids and the timestamp arrive as strings so malformed
/// values map to a 400 instead of a body-rejection, matching the API
/// contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub doctor_id: String,
    pub patient_id: Option<String>,
    pub appt_time: String,
}

/// Administrator full re-assignment of doctor/patient/time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub doctor_id: String,
    pub patient_id: String,
    pub appt_time: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Invalid {field}: {value}")]
    InvalidId { field: &'static str, value: String },

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Invalid date format, expected YYYY-MM-DD: {0}")]
    InvalidDate(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("{0}")]
    Validation(String),

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("No {0} profile exists for the current user")]
    ProfileNotFound(&'static str),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("The requested time for this doctor is already taken")]
    SlotTaken,

    #[error("{0}")]
    InvalidTransition(String),

    #[error("Storage error: {0}")]
    Database(String),
}

impl From<DirectoryError> for SchedulingError {
    fn from(err: DirectoryError) -> Self {
        SchedulingError::Database(err.to_string())
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::InvalidId { .. }
            | SchedulingError::InvalidTime(_)
            | SchedulingError::InvalidDate(_)
            | SchedulingError::InvalidStatus(_)
            | SchedulingError::Validation(_) => AppError::BadRequest(err.to_string()),
            SchedulingError::DoctorNotFound
            | SchedulingError::PatientNotFound
            | SchedulingError::AppointmentNotFound
            | SchedulingError::ProfileNotFound(_) => AppError::NotFound(err.to_string()),
            SchedulingError::PermissionDenied(_) => AppError::Forbidden(err.to_string()),
            SchedulingError::SlotTaken | SchedulingError::InvalidTransition(_) => {
                AppError::Conflict(err.to_string())
            }
            SchedulingError::Database(_) => AppError::Database(err.to_string()),
        }
    }
}
