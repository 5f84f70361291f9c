// libs/directory-cell/src/services/directory.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DirectoryError, DoctorProfile, PatientProfile, UserAccount};

/// Read-mostly access to the directory store (doctors, patients, users).
/// The only write is the idempotent doctor-patient assignment union
/// performed as a booking side effect.
pub struct DirectoryService {
    supabase: Arc<SupabaseClient>,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<DoctorProfile>, DirectoryError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        self.fetch_one(&path, auth_token).await
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<PatientProfile>, DirectoryError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        self.fetch_one(&path, auth_token).await
    }

    /// Resolve the doctor profile owned by an authenticated user, if any.
    pub async fn find_doctor_by_user(
        &self,
        user_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<DoctorProfile>, DirectoryError> {
        let path = format!("/rest/v1/doctors?user_id=eq.{}", user_id);
        self.fetch_one(&path, auth_token).await
    }

    /// Resolve the patient profile owned by an authenticated user, if any.
    pub async fn find_patient_by_user(
        &self,
        user_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<PatientProfile>, DirectoryError> {
        let path = format!("/rest/v1/patients?user_id=eq.{}", user_id);
        self.fetch_one(&path, auth_token).await
    }

    pub async fn get_user_account(
        &self,
        user_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<UserAccount>, DirectoryError> {
        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        self.fetch_one(&path, auth_token).await
    }

    /// Remember the doctor-patient relationship formed by a booking: add
    /// each party to the other's assigned set. Idempotent; records already
    /// linked are left untouched.
    pub async fn link_doctor_patient(
        &self,
        doctor: &DoctorProfile,
        patient: &PatientProfile,
        auth_token: Option<&str>,
    ) -> Result<(), DirectoryError> {
        if !patient.assigned_doctor_ids.contains(&doctor.id) {
            let mut assigned = patient.assigned_doctor_ids.clone();
            assigned.push(doctor.id);

            let path = format!("/rest/v1/patients?id=eq.{}", patient.id);
            let _: Value = self
                .supabase
                .request(
                    Method::PATCH,
                    &path,
                    auth_token,
                    Some(json!({ "assigned_doctor_ids": assigned })),
                )
                .await?;
            info!("Doctor {} assigned to patient {}", doctor.id, patient.id);
        }

        if !doctor.assigned_patient_ids.contains(&patient.id) {
            let mut assigned = doctor.assigned_patient_ids.clone();
            assigned.push(patient.id);

            let path = format!("/rest/v1/doctors?id=eq.{}", doctor.id);
            let _: Value = self
                .supabase
                .request(
                    Method::PATCH,
                    &path,
                    auth_token,
                    Some(json!({ "assigned_patient_ids": assigned })),
                )
                .await?;
            info!("Patient {} assigned to doctor {}", patient.id, doctor.id);
        }

        Ok(())
    }

    async fn fetch_one<T>(
        &self,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<T>, DirectoryError>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!("Directory lookup: {}", path);

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, auth_token, None)
            .await?;

        match rows.into_iter().next() {
            Some(row) => {
                let record =
                    serde_json::from_value(row).map_err(|e| DirectoryError::Malformed(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}
