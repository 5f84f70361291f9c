use std::env;
use tracing::warn;

/// Doctor working-day window and slot granularity used by the availability
/// calculator. Hours are clock hours in UTC; a slot starting at or after
/// `close_hour` is never offered.
#[derive(Debug, Clone)]
pub struct ClinicHours {
    pub open_hour: u32,
    pub close_hour: u32,
    pub slot_minutes: u32,
}

impl Default for ClinicHours {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 17,
            slot_minutes: 60,
        }
    }
}

impl ClinicHours {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            open_hour: parse_env_u32("CLINIC_OPEN_HOUR", defaults.open_hour),
            close_hour: parse_env_u32("CLINIC_CLOSE_HOUR", defaults.close_hour),
            slot_minutes: parse_env_u32("CLINIC_SLOT_MINUTES", defaults.slot_minutes),
        }
    }
}

fn parse_env_u32(name: &str, default: u32) -> u32 {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a number, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub clinic_hours: ClinicHours,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            clinic_hours: ClinicHours::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_clinic_hours_match_working_window() {
        let hours = ClinicHours::default();
        assert_eq!(hours.open_hour, 9);
        assert_eq!(hours.close_hour, 17);
        assert_eq!(hours.slot_minutes, 60);
    }
}
