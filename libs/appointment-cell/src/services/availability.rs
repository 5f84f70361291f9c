// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use directory_cell::services::DirectoryService;
use shared_config::{AppConfig, ClinicHours};
use shared_database::supabase::SupabaseClient;

use crate::models::SchedulingError;

/// Compute the free slot labels for one clinic day. All arithmetic is in
/// UTC: the day boundary, the "already passed" check, and the stored
/// appointment times.
///
/// A slot is offered when its start is strictly in the future and no
/// scheduled appointment occupies exactly that start time.
pub fn free_slots(
    date: NaiveDate,
    booked: &[DateTime<Utc>],
    now: DateTime<Utc>,
    hours: &ClinicHours,
) -> Vec<String> {
    if date < now.date_naive() {
        return Vec::new();
    }

    let mut slots = Vec::new();
    let mut hour = hours.open_hour;

    while hour < hours.close_hour {
        let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
            break;
        };
        let start = Utc.from_utc_datetime(&naive);

        let passed = start <= now;
        let taken = booked.iter().any(|b| *b == start);
        if !passed && !taken {
            slots.push(format!("{:02}:00", hour));
        }

        hour += hours.slot_minutes / 60;
        if hours.slot_minutes < 60 {
            // Sub-hour granularity is not configured for the clinic.
            break;
        }
    }

    slots
}

#[derive(Debug, Deserialize)]
struct BookedSlotRow {
    appt_time: DateTime<Utc>,
}

/// Public availability lookup for a doctor. Runs unauthenticated, so the
/// store is queried on the anon key only.
pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    directory: DirectoryService,
    hours: ClinicHours,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            directory: DirectoryService::with_client(Arc::clone(&supabase)),
            supabase,
            hours: config.clinic_hours.clone(),
        }
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, SchedulingError> {
        self.directory
            .get_doctor(doctor_id, None)
            .await?
            .ok_or(SchedulingError::DoctorNotFound)?;

        let booked = self.booked_times(doctor_id, date).await?;
        Ok(free_slots(date, &booked, Utc::now(), &self.hours))
    }

    /// Non-cancelled appointment start times for the doctor within the
    /// UTC day. Completed slots stay busy; only cancellation frees one.
    async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<DateTime<Utc>>, SchedulingError> {
        let day_start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            SchedulingError::InvalidDate(date.to_string())
        })?);
        let day_end = day_start + Duration::days(1);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=neq.cancelled&appt_time=gte.{}&appt_time=lt.{}&select=appt_time",
            doctor_id,
            urlencoding::encode(&day_start.to_rfc3339()),
            urlencoding::encode(&day_end.to_rfc3339()),
        );
        debug!("Fetching booked slots: {}", path);

        let rows: Vec<BookedSlotRow> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.appt_time).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours() -> ClinicHours {
        ClinicHours::default()
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn full_day_offered_when_nothing_booked() {
        let slots = free_slots(
            day("2025-06-10"),
            &[],
            at("2025-06-01T00:00:00Z"),
            &hours(),
        );
        assert_eq!(
            slots,
            vec!["09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00"]
        );
    }

    #[test]
    fn booked_slots_are_excluded() {
        let booked = vec![at("2025-06-10T10:00:00Z"), at("2025-06-10T14:00:00Z")];
        let slots = free_slots(day("2025-06-10"), &booked, at("2025-06-01T00:00:00Z"), &hours());
        assert_eq!(slots, vec!["09:00", "11:00", "12:00", "13:00", "15:00", "16:00"]);
    }

    #[test]
    fn past_day_yields_no_slots() {
        let slots = free_slots(day("2025-06-10"), &[], at("2025-06-11T08:00:00Z"), &hours());
        assert!(slots.is_empty());
    }

    #[test]
    fn todays_elapsed_slots_are_skipped() {
        // 11:30 on the requested day: 09:00-11:00 have started already.
        let slots = free_slots(day("2025-06-10"), &[], at("2025-06-10T11:30:00Z"), &hours());
        assert_eq!(slots, vec!["12:00", "13:00", "14:00", "15:00", "16:00"]);
    }

    #[test]
    fn slot_starting_exactly_now_is_not_offered() {
        let slots = free_slots(day("2025-06-10"), &[], at("2025-06-10T12:00:00Z"), &hours());
        assert_eq!(slots, vec!["13:00", "14:00", "15:00", "16:00"]);
    }

    #[test]
    fn off_hour_booking_does_not_mask_slots() {
        // A stray 10:30 record does not match any hourly slot start.
        let booked = vec![at("2025-06-10T10:30:00Z")];
        let slots = free_slots(day("2025-06-10"), &booked, at("2025-06-01T00:00:00Z"), &hours());
        assert_eq!(slots.len(), 8);
    }
}
