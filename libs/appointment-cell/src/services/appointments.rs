// libs/appointment-cell/src/services/appointments.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_store::{StoreClient, StoreError};

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, LifecycleRules, RescheduleAppointmentRequest, SortOrder, StatusFilter,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Store-facing appointment operations. Every durable state transition is a
/// call against the remote service of record; the lifecycle service guards
/// each one locally before any network round-trip.
pub struct AppointmentService {
    store: Arc<StoreClient>,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_rules(config, LifecycleRules::from(&config.lifecycle))
    }

    pub fn with_rules(config: &AppConfig, rules: LifecycleRules) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
            lifecycle: AppointmentLifecycleService::new(rules),
        }
    }

    pub fn lifecycle(&self) -> &AppointmentLifecycleService {
        &self.lifecycle
    }

    /// Get appointment by ID
    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Search appointments by scope, status set and date bounds.
    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(status_param) = query.status.as_ref().and_then(status_query_param) {
            query_parts.push(status_param);
        }
        if let Some(from_date) = query.from_date {
            let encoded = urlencoding::encode(&from_date.to_rfc3339()).into_owned();
            query_parts.push(format!("date_time=gte.{}", encoded));
        }
        if let Some(to_date) = query.to_date {
            let encoded = urlencoding::encode(&to_date.to_rfc3339()).into_owned();
            query_parts.push(format!("date_time=lte.{}", encoded));
        }

        let order = match query.sort.unwrap_or(SortOrder::Asc) {
            SortOrder::Asc => "date_time.asc",
            SortOrder::Desc => "date_time.desc",
        };
        query_parts.push(format!("order={}", order));

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));

        let appointments: Vec<Appointment> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(appointments)
    }

    /// Book a new appointment. The no-past guard runs before any store call.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking appointment for patient {} with doctor {}",
            request.patient_id, request.doctor_id
        );

        let now = Utc::now();
        self.lifecycle.validate_future_instant(request.date_time, now)?;

        let appointment_data = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "date_time": request.date_time.to_rfc3339(),
            "status": AppointmentStatus::Scheduled,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Appointment> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(representation_headers()),
            )
            .await?;

        let appointment = result
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("Store returned no created appointment".to_string()))?;

        info!("Appointment {} booked successfully", appointment.id);
        Ok(appointment)
    }

    /// Reschedule an appointment to a new instant. Only allowed while still
    /// scheduled; a past instant is rejected locally.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Rescheduling appointment: {}", appointment_id);

        // Reject a past instant before touching the store at all.
        self.lifecycle
            .validate_future_instant(request.date_time, Utc::now())?;

        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle.validate_reschedulable(&current.status)?;

        let update_data = json!({
            "date_time": request.date_time.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let updated = self
            .patch_appointment(appointment_id, update_data, auth_token)
            .await?;

        info!(
            "Appointment {} rescheduled to {}",
            appointment_id, request.date_time
        );
        Ok(updated)
    }

    /// Doctor marks a visit as done.
    pub async fn complete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition_appointment(appointment_id, AppointmentStatus::Completed, auth_token)
            .await
    }

    /// Manual or automatic cancellation.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition_appointment(appointment_id, AppointmentStatus::Cancelled, auth_token)
            .await
    }

    /// Patient check-in. Re-checking an already checked-in appointment is a
    /// no-op so a double submit cannot fail halfway through the queue flow.
    pub async fn check_in_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.status == AppointmentStatus::CheckedIn {
            debug!("Appointment {} is already checked in", appointment_id);
            return Ok(current);
        }

        self.lifecycle
            .validate_check_in(&current.status, current.date_time, Utc::now())?;

        self.write_status(appointment_id, AppointmentStatus::CheckedIn, auth_token)
            .await
    }

    /// Admin purge of an old record. Irreversible, so the retention guard
    /// runs client-side as well as whatever the store enforces.
    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        debug!("Deleting appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle.validate_purge(current.date_time, Utc::now())?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let _: () = self
            .store
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    async fn transition_appointment(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Transitioning appointment {} to {}", appointment_id, new_status);

        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle.validate_transition(&current.status, &new_status)?;

        self.write_status(appointment_id, new_status, auth_token).await
    }

    async fn write_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let update_data = json!({
            "status": new_status,
            "updated_at": Utc::now().to_rfc3339()
        });

        let updated = self
            .patch_appointment(appointment_id, update_data, auth_token)
            .await?;

        info!("Appointment {} is now {}", appointment_id, new_status);
        Ok(updated)
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let result: Vec<Appointment> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(representation_headers()),
            )
            .await?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}

fn status_query_param(filter: &StatusFilter) -> Option<String> {
    match filter {
        StatusFilter::All => None,
        StatusFilter::Only(statuses) => match statuses.as_slice() {
            [] => None,
            [single] => Some(format!("status=eq.{}", single)),
            many => {
                let list = many
                    .iter()
                    .map(AppointmentStatus::as_str)
                    .collect::<Vec<_>>()
                    .join(",");
                Some(format!("status=in.({})", list))
            }
        },
    }
}

/// Stable sort by scheduled start; returns a new ordering and leaves the
/// given slice untouched.
pub fn sort_by_date(appointments: &[Appointment], order: SortOrder) -> Vec<Appointment> {
    let mut sorted = appointments.to_vec();
    sorted.sort_by(|a, b| match order {
        SortOrder::Asc => a.date_time.cmp(&b.date_time),
        SortOrder::Desc => b.date_time.cmp(&a.date_time),
    });
    sorted
}
