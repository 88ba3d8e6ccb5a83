// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/new-appointment", post(handlers::book_appointment))
        .route("/patient-appointments/{patient_id}", get(handlers::get_patient_appointments))
        .route("/doctor-appointments/{doctor_id}", get(handlers::get_doctor_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/update-appointment/{appointment_id}", put(handlers::reschedule_appointment))
        .route("/complete-appointment/{appointment_id}", put(handlers::complete_appointment))
        .route("/cancel-appointment/{appointment_id}", put(handlers::cancel_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
