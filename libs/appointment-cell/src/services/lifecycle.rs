// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus, LifecycleRules};

/// The appointment state machine. Pure: every guard takes "now" as an
/// argument so callers and tests control time.
pub struct AppointmentLifecycleService {
    rules: LifecycleRules,
}

impl AppointmentLifecycleService {
    pub fn new(rules: LifecycleRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &LifecycleRules {
        &self.rules
    }

    /// All valid next statuses for a given current status.
    pub fn valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::CheckedIn,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::CheckedIn => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Validate that a status transition is allowed.
    pub fn validate_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::TransitionRejected {
                from: *current_status,
                to: *new_status,
            });
        }

        Ok(())
    }

    /// Check-in is only open on the appointment's calendar day, within the
    /// configured window either side of the scheduled start.
    pub fn is_within_checkin_window(
        &self,
        date_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        if date_time.date_naive() != now.date_naive() {
            return false;
        }

        let window = Duration::minutes(self.rules.checkin_window_minutes);
        let offset = now.signed_duration_since(date_time);
        offset.abs() <= window
    }

    pub fn validate_check_in(
        &self,
        current_status: &AppointmentStatus,
        date_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        self.validate_transition(current_status, &AppointmentStatus::CheckedIn)?;

        if !self.is_within_checkin_window(date_time, now) {
            return Err(AppointmentError::Validation(
                "Check-in is only available around the scheduled appointment time".to_string(),
            ));
        }

        Ok(())
    }

    /// Bookings and reschedules share the no-past guard: the candidate
    /// instant must be strictly after "now" at submission time. Runs before
    /// any store round-trip.
    pub fn validate_future_instant(
        &self,
        date_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if date_time <= now {
            return Err(AppointmentError::Validation(
                "Cannot select a past date or time".to_string(),
            ));
        }

        Ok(())
    }

    /// Only a still-scheduled appointment may change its instant.
    pub fn validate_reschedulable(
        &self,
        current_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if *current_status != AppointmentStatus::Scheduled {
            return Err(AppointmentError::TransitionRejected {
                from: *current_status,
                to: AppointmentStatus::Scheduled,
            });
        }

        Ok(())
    }

    /// Admin purge is only permitted once the appointment is old enough,
    /// regardless of its status.
    pub fn can_purge(&self, date_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.years_since(date_time)
            .is_some_and(|years| years >= self.rules.purge_retention_years)
    }

    pub fn validate_purge(
        &self,
        date_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if !self.can_purge(date_time, now) {
            return Err(AppointmentError::Validation(format!(
                "Appointments can only be deleted {} years after their date",
                self.rules.purge_retention_years
            )));
        }

        Ok(())
    }
}
