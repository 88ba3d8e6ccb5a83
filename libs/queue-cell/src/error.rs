use thiserror::Error;

use appointment_cell::models::AppointmentError;
use shared_models::error::AppError;
use shared_store::StoreError;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue ticket not found")]
    TicketNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::TicketNotFound => AppError::NotFound("Queue ticket not found".to_string()),
            QueueError::Validation(msg) => AppError::BadRequest(msg),
            QueueError::Appointment(inner) => match inner {
                AppointmentError::NotFound => {
                    AppError::NotFound("Appointment not found".to_string())
                }
                AppointmentError::Validation(msg) => AppError::BadRequest(msg),
                rejected @ AppointmentError::TransitionRejected { .. } => {
                    AppError::Conflict(rejected.to_string())
                }
                AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
                AppointmentError::Store(store_err) => store_error_to_app(store_err),
            },
            QueueError::Store(store_err) => store_error_to_app(store_err),
        }
    }
}

fn store_error_to_app(e: StoreError) -> AppError {
    match e {
        StoreError::Unauthorized(msg) => AppError::Auth(msg),
        StoreError::NotFound(msg) => AppError::NotFound(msg),
        other => AppError::Store(other.to_string()),
    }
}
