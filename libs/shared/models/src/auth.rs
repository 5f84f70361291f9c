use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub username: Option<String>,
    pub iat: Option<u64>,
}

/// Actor kinds recognised by the permission checks. Role names arrive as
/// free-form strings in the token; everything unrecognised is rejected at
/// the middleware rather than silently granted a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Case-insensitive parse accepting the historical spellings
    /// ("Patient", "SuperAdmin", "super_admin", ...).
    pub fn from_name(name: &str) -> Option<Role> {
        match name.to_ascii_lowercase().as_str() {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            "admin" => Some(Role::Admin),
            "superadmin" | "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    /// Admin and SuperAdmin carry identical capabilities everywhere in the
    /// scheduling permission matrix.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_accepts_historical_spellings() {
        assert_eq!(Role::from_name("Patient"), Some(Role::Patient));
        assert_eq!(Role::from_name("doctor"), Some(Role::Doctor));
        assert_eq!(Role::from_name("Admin"), Some(Role::Admin));
        assert_eq!(Role::from_name("SuperAdmin"), Some(Role::SuperAdmin));
        assert_eq!(Role::from_name("super_admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::from_name("nurse"), None);
    }

    #[test]
    fn only_admin_variants_are_admin() {
        assert!(Role::Admin.is_admin());
        assert!(Role::SuperAdmin.is_admin());
        assert!(!Role::Doctor.is_admin());
        assert!(!Role::Patient.is_admin());
    }
}
