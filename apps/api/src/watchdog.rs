use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use appointment_cell::models::{AppointmentSearchQuery, AppointmentStatus, StatusFilter};
use appointment_cell::services::appointments::AppointmentService;
use appointment_cell::services::autocancel::{
    AutoCancelScheduler, StoreCancellationSink, SystemClock,
};
use shared_config::AppConfig;

const REFRESH_INTERVAL_SECS: u64 = 60;

/// Feeds one auto-cancel scheduler with the current `scheduled` set.
/// Exactly one instance runs per process; the scheduler itself guarantees
/// at most one cancellation per appointment.
pub async fn run(config: Arc<AppConfig>, service_token: String) {
    let service = Arc::new(AppointmentService::new(&config));
    let sink = Arc::new(StoreCancellationSink::new(
        Arc::clone(&service),
        service_token.clone(),
    ));
    let scheduler = AutoCancelScheduler::new(Arc::new(SystemClock), sink, &config.lifecycle);

    info!("Auto-cancellation watchdog started");

    let mut interval = tokio::time::interval(Duration::from_secs(REFRESH_INTERVAL_SECS));

    loop {
        interval.tick().await;

        let query = AppointmentSearchQuery {
            status: Some(StatusFilter::only(AppointmentStatus::Scheduled)),
            ..Default::default()
        };

        match service.search_appointments(query, &service_token).await {
            Ok(appointments) => scheduler.sync(&appointments),
            Err(e) => warn!("Auto-cancel refresh failed: {}", e),
        }
    }
}
