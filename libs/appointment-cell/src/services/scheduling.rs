// libs/appointment-cell/src/services/scheduling.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use directory_cell::models::PatientProfile;
use directory_cell::services::DirectoryService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{Role, User};

use crate::models::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, SchedulingError,
    UpdateAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Booking and lifecycle operations on appointments.
///
/// Writes go through PostgREST with `Prefer: return=representation` so every
/// mutation hands back the stored row. The slot pre-check keeps the common
/// double-booking path friendly; the partial unique index on
/// (doctor_id, appt_time) is the real enforcement and surfaces as a 409.
pub struct AppointmentSchedulerService {
    supabase: Arc<SupabaseClient>,
    directory: DirectoryService,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentSchedulerService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            directory: DirectoryService::with_client(Arc::clone(&supabase)),
            supabase,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    // --------------------------------------------------------------------------
    // CREATE
    // --------------------------------------------------------------------------

    pub async fn create(
        &self,
        user: &User,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let doctor_id = parse_uuid("doctorId", &request.doctor_id)?;
        let appt_time = parse_time(&request.appt_time)?;

        let doctor = self
            .directory
            .get_doctor(doctor_id, Some(auth_token))
            .await?
            .ok_or(SchedulingError::DoctorNotFound)?;

        let patient = self
            .resolve_booking_patient(user, request.patient_id.as_deref(), auth_token)
            .await?;

        if self
            .slot_is_taken(doctor_id, appt_time, None, auth_token)
            .await?
        {
            return Err(SchedulingError::SlotTaken);
        }

        let body = json!({
            "doctor_id": doctor_id,
            "patient_id": patient.id,
            "appt_time": appt_time.to_rfc3339(),
            "status": AppointmentStatus::Scheduled.to_string(),
        });

        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    SchedulingError::SlotTaken
                } else {
                    SchedulingError::Database(e.to_string())
                }
            })?;

        let appointment = rows
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Database("Insert returned no row".to_string()))?;

        info!(
            "Appointment {} booked: doctor {} / patient {} at {}",
            appointment.id, doctor.id, patient.id, appointment.appt_time
        );

        // Booking implies the care relationship; a failure here must not
        // undo an already-stored appointment.
        if let Err(e) = self
            .directory
            .link_doctor_patient(&doctor, &patient, Some(auth_token))
            .await
        {
            warn!(
                "Could not link doctor {} and patient {}: {}",
                doctor.id, patient.id, e
            );
        }

        Ok(appointment)
    }

    /// Who is this appointment for? Patients always book for their own
    /// profile; administrators name any existing patient.
    async fn resolve_booking_patient(
        &self,
        user: &User,
        requested_patient_id: Option<&str>,
        auth_token: &str,
    ) -> Result<PatientProfile, SchedulingError> {
        if user.role == Role::Patient {
            let own = self
                .directory
                .find_patient_by_user(&user.id, Some(auth_token))
                .await?
                .ok_or(SchedulingError::ProfileNotFound("patient"))?;

            if let Some(requested) = requested_patient_id {
                let requested = parse_uuid("patientId", requested)?;
                if requested != own.id {
                    return Err(SchedulingError::PermissionDenied(
                        "Patients can only book appointments for themselves".to_string(),
                    ));
                }
            }
            return Ok(own);
        }

        if user.role.is_admin() {
            let requested = requested_patient_id.ok_or_else(|| {
                SchedulingError::Validation(
                    "patientId is required when booking on behalf of a patient".to_string(),
                )
            })?;
            let patient_id = parse_uuid("patientId", requested)?;
            return self
                .directory
                .get_patient(patient_id, Some(auth_token))
                .await?
                .ok_or(SchedulingError::PatientNotFound);
        }

        Err(SchedulingError::PermissionDenied(
            "Only patients and administrators can book appointments".to_string(),
        ))
    }

    // --------------------------------------------------------------------------
    // READS
    // --------------------------------------------------------------------------

    pub async fn list_all(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        if !user.role.is_admin() {
            return Err(SchedulingError::PermissionDenied(
                "Only administrators can list all appointments".to_string(),
            ));
        }

        self.fetch_list("/rest/v1/appointments?order=appt_time.desc", auth_token)
            .await
    }

    pub async fn list_for_patient(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let patient = self
            .directory
            .find_patient_by_user(&user.id, Some(auth_token))
            .await?
            .ok_or(SchedulingError::ProfileNotFound("patient"))?;

        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=appt_time.asc",
            patient.id
        );
        self.fetch_list(&path, auth_token).await
    }

    pub async fn list_for_doctor(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let doctor = self
            .directory
            .find_doctor_by_user(&user.id, Some(auth_token))
            .await?
            .ok_or(SchedulingError::ProfileNotFound("doctor"))?;

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=appt_time.asc",
            doctor.id
        );
        self.fetch_list(&path, auth_token).await
    }

    /// Fetch one appointment and enforce visibility: administrators see
    /// everything, patients and doctors only their own.
    pub async fn get_appointment_checked(
        &self,
        user: &User,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        if user.role.is_admin() {
            return Ok(appointment);
        }

        match user.role {
            Role::Patient => {
                let patient = self
                    .directory
                    .find_patient_by_user(&user.id, Some(auth_token))
                    .await?;
                if patient.map(|p| p.id) == Some(appointment.patient_id) {
                    return Ok(appointment);
                }
            }
            Role::Doctor => {
                let doctor = self
                    .directory
                    .find_doctor_by_user(&user.id, Some(auth_token))
                    .await?;
                if doctor.map(|d| d.id) == Some(appointment.doctor_id) {
                    return Ok(appointment);
                }
            }
            _ => {}
        }

        Err(SchedulingError::PermissionDenied(
            "You do not have access to this appointment".to_string(),
        ))
    }

    // --------------------------------------------------------------------------
    // LIFECYCLE WRITES
    // --------------------------------------------------------------------------

    /// Patient-facing cancellation. Admins may cancel any appointment; a
    /// patient only their own, and only while it is still scheduled.
    pub async fn cancel(
        &self,
        user: &User,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        if !user.role.is_admin() {
            if user.role != Role::Patient {
                return Err(SchedulingError::PermissionDenied(
                    "Only the booked patient or an administrator can cancel".to_string(),
                ));
            }
            let patient = self
                .directory
                .find_patient_by_user(&user.id, Some(auth_token))
                .await?
                .ok_or(SchedulingError::ProfileNotFound("patient"))?;
            if patient.id != appointment.patient_id {
                return Err(SchedulingError::PermissionDenied(
                    "Patients can only cancel their own appointments".to_string(),
                ));
            }
        }

        self.lifecycle.ensure_cancellable(appointment.status)?;
        self.patch_appointment(
            appointment_id,
            json!({
                "status": AppointmentStatus::Cancelled.to_string(),
                "updated_at": Utc::now().to_rfc3339(),
            }),
            auth_token,
        )
        .await
    }

    /// Doctor/admin status update through the lifecycle state machine.
    pub async fn update_status(
        &self,
        user: &User,
        appointment_id: Uuid,
        status: &str,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let new_status = AppointmentStatus::from_name(status)
            .ok_or_else(|| SchedulingError::InvalidStatus(status.to_string()))?;

        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        if !user.role.is_admin() {
            if user.role != Role::Doctor {
                return Err(SchedulingError::PermissionDenied(
                    "Only the treating doctor or an administrator can change status".to_string(),
                ));
            }
            let doctor = self
                .directory
                .find_doctor_by_user(&user.id, Some(auth_token))
                .await?
                .ok_or(SchedulingError::ProfileNotFound("doctor"))?;
            if doctor.id != appointment.doctor_id {
                return Err(SchedulingError::PermissionDenied(
                    "Doctors can only update their own appointments".to_string(),
                ));
            }
        }

        self.lifecycle.validate_status_transition(
            appointment.status,
            new_status,
            user.role.is_admin(),
        )?;

        if appointment.status == new_status {
            return Ok(appointment);
        }

        self.patch_appointment(
            appointment_id,
            json!({
                "status": new_status.to_string(),
                "updated_at": Utc::now().to_rfc3339(),
            }),
            auth_token,
        )
        .await
    }

    /// Administrator full re-assignment. Re-runs the slot conflict check
    /// against the new doctor/time, excluding the appointment itself.
    pub async fn update_full(
        &self,
        user: &User,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        if !user.role.is_admin() {
            return Err(SchedulingError::PermissionDenied(
                "Only administrators can reassign appointments".to_string(),
            ));
        }

        let doctor_id = parse_uuid("doctorId", &request.doctor_id)?;
        let patient_id = parse_uuid("patientId", &request.patient_id)?;
        let appt_time = parse_time(&request.appt_time)?;

        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        self.directory
            .get_doctor(doctor_id, Some(auth_token))
            .await?
            .ok_or(SchedulingError::DoctorNotFound)?;
        self.directory
            .get_patient(patient_id, Some(auth_token))
            .await?
            .ok_or(SchedulingError::PatientNotFound)?;

        let mut body = json!({
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "appt_time": appt_time.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let target_status = match request.status.as_deref() {
            Some(raw) => {
                let status = AppointmentStatus::from_name(raw)
                    .ok_or_else(|| SchedulingError::InvalidStatus(raw.to_string()))?;
                self.lifecycle
                    .validate_status_transition(appointment.status, status, true)?;
                body["status"] = Value::String(status.to_string());
                status
            }
            None => appointment.status,
        };

        if target_status == AppointmentStatus::Scheduled
            && self
                .slot_is_taken(doctor_id, appt_time, Some(appointment_id), auth_token)
                .await?
        {
            return Err(SchedulingError::SlotTaken);
        }

        self.patch_appointment(appointment_id, body, auth_token).await
    }

    pub async fn delete(
        &self,
        user: &User,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        if !user.role.is_admin() {
            return Err(SchedulingError::PermissionDenied(
                "Only administrators can delete appointments".to_string(),
            ));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(representation_headers()),
            )
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(SchedulingError::AppointmentNotFound)
    }

    // --------------------------------------------------------------------------
    // STORAGE HELPERS
    // --------------------------------------------------------------------------

    async fn fetch_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self.fetch_list(&path, auth_token).await?;
        rows.into_iter()
            .next()
            .ok_or(SchedulingError::AppointmentNotFound)
    }

    async fn fetch_list(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        self.supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))
    }

    /// Is there another non-cancelled appointment for this doctor at
    /// exactly this time? `exclude` skips the appointment being
    /// rescheduled.
    async fn slot_is_taken(
        &self,
        doctor_id: Uuid,
        appt_time: DateTime<Utc>,
        exclude: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appt_time=eq.{}&status=neq.cancelled&select=id",
            doctor_id,
            urlencoding::encode(&appt_time.to_rfc3339()),
        );
        if let Some(id) = exclude {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Ok(!rows.is_empty())
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        body: Value,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    SchedulingError::SlotTaken
                } else {
                    SchedulingError::Database(e.to_string())
                }
            })?;

        rows.into_iter()
            .next()
            .ok_or(SchedulingError::AppointmentNotFound)
    }
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, SchedulingError> {
    Uuid::parse_str(value).map_err(|_| SchedulingError::InvalidId {
        field,
        value: value.to_string(),
    })
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, SchedulingError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| SchedulingError::InvalidTime(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_parse_reports_field_name() {
        let err = parse_uuid("doctorId", "not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("doctorId"));
    }

    #[test]
    fn time_parse_accepts_rfc3339_with_offset() {
        let parsed = parse_time("2025-06-10T10:00:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-06-10T08:00:00+00:00");
    }

    #[test]
    fn time_parse_rejects_bare_date() {
        assert!(parse_time("2025-06-10").is_err());
    }
}
