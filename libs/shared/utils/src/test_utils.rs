use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            clinic_hours: Default::default(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: String,
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            username: email.split('@').next().unwrap_or("user").to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "Doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "Patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "Admin")
    }

    pub fn to_user(&self) -> shared_models::auth::User {
        shared_models::auth::User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            username: Some(self.username.clone()),
            role: shared_models::auth::Role::from_name(&self.role)
                .unwrap_or(shared_models::auth::Role::Patient),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_token(user: &TestUser, secret: &str) -> String {
        let exp = (Utc::now() + Duration::hours(1)).timestamp() as u64;
        Self::create_token_with_exp(user, secret, exp)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        let exp = (Utc::now() - Duration::hours(1)).timestamp() as u64;
        Self::create_token_with_exp(user, secret, exp)
    }

    fn create_token_with_exp(user: &TestUser, secret: &str, exp: u64) -> String {
        let header = json!({"alg": "HS256", "typ": "JWT"});
        let claims = json!({
            "sub": user.id,
            "email": user.email,
            "username": user.username,
            "role": user.role,
            "exp": exp,
            "iat": Utc::now().timestamp(),
        });

        let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string());
        let signing_input = format!("{}.{}", header_b64, claims_b64);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }
}

/// Canned storage rows matching the table shapes the cells read.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_row(id: &str, user_id: &str, first_name: &str, last_name: &str) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "first_name": first_name,
            "last_name": last_name,
            "specialty": "General Practice",
            "assigned_patient_ids": [],
        })
    }

    pub fn patient_row(id: &str, user_id: &str, first_name: &str, last_name: &str) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "first_name": first_name,
            "last_name": last_name,
            "assigned_doctor_ids": [],
        })
    }

    pub fn user_row(id: &str, username: &str, email: &str) -> Value {
        json!({
            "id": id,
            "username": username,
            "email": email,
        })
    }

    pub fn appointment_row(
        id: &str,
        doctor_id: &str,
        patient_id: &str,
        appt_time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "appt_time": appt_time,
            "status": status,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        })
    }

    pub fn chat_message_row(
        id: &str,
        sender_id: &str,
        receiver_id: &str,
        message: &str,
        conversation_id: &str,
    ) -> Value {
        json!({
            "id": id,
            "sender_id": sender_id,
            "receiver_id": receiver_id,
            "message": message,
            "conversation_id": conversation_id,
            "read": false,
            "created_at": Utc::now().to_rfc3339(),
        })
    }
}
