use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_store::{StoreClient, StoreError};

use crate::error::QueueError;
use crate::models::QueueTicket;

/// Sequential per-doctor-per-day queue numbering.
///
/// The store guarantees that numbers for one doctor-day are issued in
/// strictly increasing order with no reuse; this service only decides the
/// next value and keeps issuance idempotent per appointment.
pub struct QueueTicketService {
    store: Arc<StoreClient>,
}

impl QueueTicketService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
        }
    }

    /// Latest ticket issued for a doctor today, if any.
    pub async fn current_ticket(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<QueueTicket>, QueueError> {
        self.current_ticket_on(doctor_id, Utc::now().date_naive(), auth_token)
            .await
    }

    pub async fn current_ticket_on(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        auth_token: &str,
    ) -> Result<Option<QueueTicket>, QueueError> {
        debug!("Fetching current queue number for doctor {}", doctor_id);

        let path = format!(
            "/rest/v1/queue_tickets?doctor_id=eq.{}&issued_on=eq.{}&order=number.desc&limit=1",
            doctor_id, day
        );

        let result: Vec<QueueTicket> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(result.into_iter().next())
    }

    /// The ticket tied to one appointment, if one was issued.
    pub async fn patient_ticket(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<QueueTicket>, QueueError> {
        debug!("Fetching queue ticket for appointment {}", appointment_id);

        let path = format!(
            "/rest/v1/queue_tickets?appointment_id=eq.{}&limit=1",
            appointment_id
        );

        let result: Vec<QueueTicket> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(result.into_iter().next())
    }

    /// Issue a ticket for an appointment, reusing the existing one if the
    /// appointment already holds a number. The store does not dedup
    /// server-side, so the get-before-issue guard lives here.
    pub async fn issue_ticket(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<QueueTicket, QueueError> {
        if let Some(existing) = self.patient_ticket(appointment_id, auth_token).await? {
            debug!(
                "Appointment {} already holds queue number {}",
                appointment_id, existing.number
            );
            return Ok(existing);
        }

        let today = Utc::now().date_naive();
        let next_number = self
            .current_ticket_on(doctor_id, today, auth_token)
            .await?
            .map(|ticket| ticket.number + 1)
            .unwrap_or(1);

        let ticket_data = json!({
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "appointment_id": appointment_id,
            "number": next_number,
            "issued_on": today.to_string(),
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<QueueTicket> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/queue_tickets",
                Some(auth_token),
                Some(ticket_data),
                Some(headers),
            )
            .await?;

        let ticket = result
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("Store returned no created ticket".to_string()))?;

        info!(
            "Issued queue number {} for doctor {} (appointment {})",
            ticket.number, doctor_id, appointment_id
        );
        Ok(ticket)
    }
}
