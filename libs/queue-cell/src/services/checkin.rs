use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::services::appointments::AppointmentService;
use shared_config::AppConfig;

use crate::error::QueueError;
use crate::models::{CheckInResult, QueueTicket};
use crate::services::tickets::QueueTicketService;

/// Orchestrates a patient check-in: validates the appointment is eligible,
/// moves it to `checked-in`, then issues (or looks up) the queue ticket.
pub struct CheckInService {
    appointments: AppointmentService,
    tickets: QueueTicketService,
}

impl CheckInService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            appointments: AppointmentService::new(config),
            tickets: QueueTicketService::new(config),
        }
    }

    pub async fn check_in(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<CheckInResult, QueueError> {
        debug!("Checking in appointment {}", appointment_id);

        // Same-day and window guards live in the appointment state machine;
        // a repeated check-in passes straight through.
        let appointment = self
            .appointments
            .check_in_appointment(appointment_id, auth_token)
            .await?;

        let ticket = self
            .tickets
            .issue_ticket(
                appointment.doctor_id,
                appointment.patient_id,
                appointment.id,
                auth_token,
            )
            .await?;

        let current_number = self
            .tickets
            .current_ticket(appointment.doctor_id, auth_token)
            .await?
            .map(|t| t.number)
            .unwrap_or(ticket.number);

        info!(
            "Patient {} checked in with queue number {} (doctor {})",
            appointment.patient_id, ticket.number, appointment.doctor_id
        );

        Ok(CheckInResult {
            appointment,
            ticket,
            current_number,
        })
    }

    pub async fn current_ticket(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<QueueTicket>, QueueError> {
        self.tickets.current_ticket(doctor_id, auth_token).await
    }

    pub async fn patient_ticket(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<QueueTicket>, QueueError> {
        self.tickets.patient_ticket(appointment_id, auth_token).await
    }

    /// The patient a check-in request is allowed for, resolved from the
    /// appointment itself so the caller cannot check in somebody else.
    pub async fn appointment_patient(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Uuid, QueueError> {
        let appointment = self
            .appointments
            .get_appointment(appointment_id, auth_token)
            .await?;
        Ok(appointment.patient_id)
    }
}
