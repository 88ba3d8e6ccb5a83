use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::models::Appointment;

/// A queue position: a sequential number scoped to one doctor and one
/// calendar day, tied to exactly one appointment. Absence of a ticket is
/// modelled as `Option::None`, never as number zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueTicket {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Uuid,
    pub number: i32,
    pub issued_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTicketRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Uuid,
}

/// Everything the check-in screen needs after a successful check-in.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInResult {
    pub appointment: Appointment,
    pub ticket: QueueTicket,
    /// Latest number issued for the doctor today, the ticket above included.
    pub current_number: i32,
}
