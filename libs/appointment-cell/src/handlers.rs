// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_store::StoreError;

use crate::models::{
    AppointmentError, AppointmentSearchQuery, BookAppointmentRequest,
    RescheduleAppointmentRequest, SortOrder, StatusFilter,
};
use crate::services::appointments::AppointmentService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AppointmentListParams {
    pub status: Option<String>,
    pub sort: Option<String>,
}

impl AppointmentListParams {
    fn to_search_query(&self) -> Result<(StatusFilter, SortOrder), AppError> {
        let filter = StatusFilter::parse(self.status.as_deref())
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let sort = SortOrder::parse(self.sort.as_deref())
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok((filter, sort))
    }
}

fn to_app_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::Validation(msg) => AppError::BadRequest(msg),
        rejected @ AppointmentError::TransitionRejected { .. } => {
            AppError::Conflict(rejected.to_string())
        }
        AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
        AppointmentError::Store(StoreError::Unauthorized(msg)) => AppError::Auth(msg),
        AppointmentError::Store(StoreError::NotFound(msg)) => AppError::NotFound(msg),
        AppointmentError::Store(store_err) => AppError::Store(store_err.to_string()),
    }
}

// ==============================================================================
// LISTING HANDLERS
// ==============================================================================

/// Full appointment listing, admin only.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AppointmentListParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins may list all appointments".to_string(),
        ));
    }

    let (status, sort) = params.to_search_query()?;
    let service = AppointmentService::new(&state);

    let appointments = service
        .search_appointments(
            AppointmentSearchQuery {
                status: Some(status),
                sort: Some(sort),
                ..Default::default()
            },
            auth.token(),
        )
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    Query(params): Query<AppointmentListParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_self(&patient_id) && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this patient's appointments".to_string(),
        ));
    }

    let (status, sort) = params.to_search_query()?;
    let service = AppointmentService::new(&state);

    let appointments = service
        .search_appointments(
            AppointmentSearchQuery {
                patient_id: Some(patient_id),
                status: Some(status),
                sort: Some(sort),
                ..Default::default()
            },
            auth.token(),
        )
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(params): Query<AppointmentListParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_self(&doctor_id) && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this doctor's appointments".to_string(),
        ));
    }

    let (status, sort) = params.to_search_query()?;
    let service = AppointmentService::new(&state);

    let appointments = service
        .search_appointments(
            AppointmentSearchQuery {
                doctor_id: Some(doctor_id),
                status: Some(status),
                sort: Some(sort),
                ..Default::default()
            },
            auth.token(),
        )
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&state);

    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(to_app_error)?;

    // Only the involved patient, the involved doctor, or an admin may view.
    if !user.is_self(&appointment.patient_id)
        && !user.is_self(&appointment.doctor_id)
        && !user.is_admin()
    {
        return Err(AppError::Forbidden(
            "Not authorized to view this appointment".to_string(),
        ));
    }

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let is_patient = user.is_patient() && user.is_self(&request.patient_id);

    if !is_patient && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to book an appointment for this patient".to_string(),
        ));
    }

    let service = AppointmentService::new(&state);
    let appointment = service
        .book_appointment(request, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    // Patient or doctor on the appointment may move it; admins always can.
    let is_patient = user.is_patient() && user.is_self(&request.patient_id);
    let is_doctor = user.is_doctor() && user.is_self(&request.doctor_id);

    if !is_patient && !is_doctor && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to reschedule this appointment".to_string(),
        ));
    }

    let service = AppointmentService::new(&state);
    let appointment = service
        .reschedule_appointment(appointment_id, request, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&state);

    let current = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(to_app_error)?;

    let is_doctor = user.is_doctor() && user.is_self(&current.doctor_id);
    if !is_doctor && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only the appointment's doctor may mark it completed".to_string(),
        ));
    }

    let appointment = service
        .complete_appointment(appointment_id, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&state);

    let current = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(to_app_error)?;

    let is_involved = user.is_self(&current.patient_id) || user.is_self(&current.doctor_id);
    if !is_involved && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to cancel this appointment".to_string(),
        ));
    }

    let appointment = service
        .cancel_appointment(appointment_id, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins may delete appointments".to_string(),
        ));
    }

    let service = AppointmentService::new(&state);
    service
        .delete_appointment(appointment_id, auth.token())
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}
