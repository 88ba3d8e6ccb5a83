use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};

use appointment_cell::router::appointment_routes;
use queue_cell::router::queue_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "ClinicDesk API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/queues", queue_routes(state.clone()))
}
