// libs/appointment-cell/src/services/lifecycle.rs
use crate::models::{AppointmentStatus, SchedulingError};

/// Status-transition rules for the appointment state machine.
///
/// scheduled -> completed | cancelled is open to doctors and admins;
/// reopening a cancelled appointment is an admin-only correction, and a
/// completed appointment can never be cancelled after the fact.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        new: AppointmentStatus,
        is_admin: bool,
    ) -> Result<(), SchedulingError> {
        use AppointmentStatus::*;

        if current == new {
            // Idempotent no-op, not an error.
            return Ok(());
        }

        match (current, new) {
            (Scheduled, Completed) | (Scheduled, Cancelled) => Ok(()),
            (Cancelled, Scheduled) => {
                if is_admin {
                    Ok(())
                } else {
                    Err(SchedulingError::PermissionDenied(
                        "Only an administrator can reopen a cancelled appointment".to_string(),
                    ))
                }
            }
            (Completed, Cancelled) => Err(SchedulingError::InvalidTransition(
                "A completed appointment cannot be cancelled".to_string(),
            )),
            (from, to) => Err(SchedulingError::InvalidTransition(format!(
                "Cannot change appointment status from {} to {}",
                from, to
            ))),
        }
    }

    /// Patient-facing cancellation only applies to appointments that are
    /// still scheduled.
    pub fn ensure_cancellable(
        &self,
        current: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        match current {
            AppointmentStatus::Scheduled => Ok(()),
            AppointmentStatus::Completed => Err(SchedulingError::InvalidTransition(
                "A completed appointment cannot be cancelled".to_string(),
            )),
            AppointmentStatus::Cancelled => Err(SchedulingError::InvalidTransition(
                "Appointment is already cancelled".to_string(),
            )),
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use AppointmentStatus::*;

    #[test]
    fn scheduled_can_complete_or_cancel() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle
            .validate_status_transition(Scheduled, Completed, false)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(Scheduled, Cancelled, false)
            .is_ok());
    }

    #[test]
    fn same_status_is_a_no_op() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle
            .validate_status_transition(Completed, Completed, false)
            .is_ok());
        assert!(lifecycle
            .validate_status_transition(Cancelled, Cancelled, false)
            .is_ok());
    }

    #[test]
    fn reopening_cancelled_requires_admin() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_status_transition(Cancelled, Scheduled, false),
            Err(SchedulingError::PermissionDenied(_))
        );
        assert!(lifecycle
            .validate_status_transition(Cancelled, Scheduled, true)
            .is_ok());
    }

    #[test]
    fn completed_cannot_be_cancelled_even_by_admin() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_status_transition(Completed, Cancelled, true),
            Err(SchedulingError::InvalidTransition(_))
        );
    }

    #[test]
    fn cancellable_only_while_scheduled() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle.ensure_cancellable(Scheduled).is_ok());
        assert_matches!(
            lifecycle.ensure_cancellable(Completed),
            Err(SchedulingError::InvalidTransition(_))
        );
        assert_matches!(
            lifecycle.ensure_cancellable(Cancelled),
            Err(SchedulingError::InvalidTransition(_))
        );
    }
}
