// libs/appointment-cell/src/services/autocancel.rs
use std::cmp;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::LifecycleSettings;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::appointments::AppointmentService;

/// Source of "now". Injected so tests can drive time deterministically
/// instead of sleeping against the wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Where an automatic cancellation lands once a deadline passes.
#[async_trait]
pub trait CancellationSink: Send + Sync {
    async fn cancel(&self, appointment_id: Uuid) -> Result<(), AppointmentError>;
}

/// Production sink: the store-backed cancel operation, bound to the
/// session's auth token.
pub struct StoreCancellationSink {
    service: Arc<AppointmentService>,
    auth_token: String,
}

impl StoreCancellationSink {
    pub fn new(service: Arc<AppointmentService>, auth_token: impl Into<String>) -> Self {
        Self {
            service,
            auth_token: auth_token.into(),
        }
    }
}

#[async_trait]
impl CancellationSink for StoreCancellationSink {
    async fn cancel(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.service
            .cancel_appointment(appointment_id, &self.auth_token)
            .await
            .map(|_| ())
    }
}

struct SchedulerState {
    /// Live wait-timers, one per appointment id at most.
    timers: Mutex<HashMap<Uuid, JoinHandle<()>>>,
    /// Ids a cancellation has already been issued for. Never pruned during
    /// the scheduler's lifetime, so a later refresh cannot re-issue.
    processed: Mutex<HashSet<Uuid>>,
}

/// Guarantees that any appointment left in `scheduled` more than the grace
/// period past its start is cancelled automatically, exactly once per
/// scheduler lifetime.
///
/// A single wait is capped at `max_timer_delay`; appointments booked far
/// ahead (up to a year) are handled by chaining capped waits until the
/// deadline is reached, so a long deadline can never overflow a timer or
/// fire early.
pub struct AutoCancelScheduler {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn CancellationSink>,
    grace: Duration,
    max_timer_delay: StdDuration,
    state: Arc<SchedulerState>,
}

impl AutoCancelScheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        sink: Arc<dyn CancellationSink>,
        settings: &LifecycleSettings,
    ) -> Self {
        Self {
            clock,
            sink,
            grace: Duration::minutes(settings.auto_cancel_grace_minutes),
            max_timer_delay: StdDuration::from_millis(settings.max_timer_delay_ms),
            state: Arc::new(SchedulerState {
                timers: Mutex::new(HashMap::new()),
                processed: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Re-arm against a freshly loaded appointment set. All previously
    /// armed timers are cleared first, then every `scheduled` appointment
    /// that has not had a cancellation issued yet gets exactly one timer;
    /// appointments already past their deadline are cancelled straight away.
    pub fn sync(&self, appointments: &[Appointment]) {
        self.clear_timers();

        for appointment in appointments {
            if appointment.status != AppointmentStatus::Scheduled {
                continue;
            }
            if self.is_processed(appointment.id) {
                continue;
            }

            let deadline = appointment.date_time + self.grace;
            let now = self.clock.now();

            if now >= deadline {
                debug!(
                    "Appointment {} already {}s past its deadline, cancelling immediately",
                    appointment.id,
                    (now - deadline).num_seconds()
                );
            } else {
                debug!(
                    "Arming auto-cancel timer for appointment {} firing in {}s",
                    appointment.id,
                    (deadline - now).num_seconds()
                );
            }

            self.arm(appointment.id, deadline);
        }
    }

    /// Number of timers currently armed.
    pub fn pending_timers(&self) -> usize {
        self.state.timers.lock().unwrap().len()
    }

    pub fn is_processed(&self, appointment_id: Uuid) -> bool {
        self.state.processed.lock().unwrap().contains(&appointment_id)
    }

    /// Abort every outstanding wait-timer. Idempotent.
    pub fn clear_timers(&self) {
        let handles: Vec<(Uuid, JoinHandle<()>)> =
            self.state.timers.lock().unwrap().drain().collect();

        for (id, handle) in handles {
            debug!("Clearing auto-cancel timer for appointment {}", id);
            handle.abort();
        }
    }

    /// Synchronously cancel all timers. After teardown no further
    /// cancellation is issued by this instance; an in-flight store call is
    /// dropped with its timer task.
    pub fn teardown(&self) {
        info!("Tearing down auto-cancel scheduler");
        self.clear_timers();
    }

    fn arm(&self, appointment_id: Uuid, deadline: DateTime<Utc>) {
        let clock = Arc::clone(&self.clock);
        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);
        let max_delay = self.max_timer_delay;

        let handle = tokio::spawn(async move {
            // Chain capped waits until the deadline is actually reached.
            // Re-reading the clock after every hop keeps accumulated drift
            // from firing the cancellation early.
            loop {
                let now = clock.now();
                if now >= deadline {
                    break;
                }

                let remaining = (deadline - now).to_std().unwrap_or(StdDuration::ZERO);
                let wait = cmp::min(remaining, max_delay);
                tokio::time::sleep(wait).await;
            }

            // Mark processed before issuing the call so no refresh can arm
            // a second timer for this id.
            if !state.processed.lock().unwrap().insert(appointment_id) {
                state.timers.lock().unwrap().remove(&appointment_id);
                return;
            }

            info!(
                "Auto-cancelling appointment {} past its grace period",
                appointment_id
            );

            if let Err(e) = sink.cancel(appointment_id).await {
                // No retry: the id stays processed, and a stuck appointment
                // needs a manual cancel or a fresh scheduler lifecycle.
                error!("Auto-cancel failed for appointment {}: {}", appointment_id, e);
            }

            state.timers.lock().unwrap().remove(&appointment_id);
        });

        self.state
            .timers
            .lock()
            .unwrap()
            .insert(appointment_id, handle);
    }
}

impl Drop for AutoCancelScheduler {
    fn drop(&mut self) {
        self.clear_timers();
    }
}
