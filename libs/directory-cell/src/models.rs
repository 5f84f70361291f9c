// libs/directory-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::supabase::SupabaseError;

/// Doctor profile record. `user_id` links the profile to exactly one
/// authenticated account; every ownership check resolves through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialty: Option<String>,
    #[serde(default)]
    pub assigned_patient_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub assigned_doctor_ids: Vec<Uuid>,
}

/// Account record from the `users` table; read-only existence and
/// display-name source for chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Storage error: {0}")]
    Database(#[from] SupabaseError),

    #[error("Failed to parse record: {0}")]
    Malformed(String),
}
