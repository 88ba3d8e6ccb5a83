use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::IssueTicketRequest;
use crate::services::checkin::CheckInService;

/// Patient checks in for a same-day appointment and receives a queue
/// number. Issuing twice for the same appointment returns the same number.
#[axum::debug_handler]
pub async fn new_queue_number(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<IssueTicketRequest>,
) -> Result<Json<Value>, AppError> {
    let is_patient = user.is_patient() && user.is_self(&request.patient_id);

    if !is_patient && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to check in for this patient".to_string(),
        ));
    }

    let service = CheckInService::new(&state);

    // The appointment is the source of truth for who may check in, not the
    // ids the client posted.
    let owner = service
        .appointment_patient(request.appointment_id, auth.token())
        .await
        .map_err(AppError::from)?;

    if !user.is_self(&owner) && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to check in for this appointment".to_string(),
        ));
    }

    let result = service
        .check_in(request.appointment_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "success": true,
        "number": result.ticket.number,
        "current_number": result.current_number,
        "appointment": result.appointment,
        "message": "Successfully checked in"
    })))
}

/// Latest-issued queue number for a doctor today. `number` is null when no
/// queue exists yet; zero is never used as an absence marker.
#[axum::debug_handler]
pub async fn get_current_queue_number(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = CheckInService::new(&state);

    let ticket = service
        .current_ticket(doctor_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "number": ticket.map(|t| t.number)
    })))
}

/// The queue number tied to one appointment, if issued.
#[axum::debug_handler]
pub async fn get_patient_queue_number(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = CheckInService::new(&state);

    let ticket = service
        .patient_ticket(appointment_id, auth.token())
        .await
        .map_err(AppError::from)?;

    if let Some(ref ticket) = ticket {
        if !user.is_self(&ticket.patient_id) && !user.is_admin() {
            return Err(AppError::Forbidden(
                "Not authorized to view this queue number".to_string(),
            ));
        }
    }

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "number": ticket.map(|t| t.number)
    })))
}
