use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_api_key: String,
    pub jwt_secret: String,
    pub lifecycle: LifecycleSettings,
}

/// Tunable durations for the appointment lifecycle. Product defaults live
/// here rather than as literals inside the services.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Minutes past the scheduled start before an untouched appointment is
    /// auto-cancelled.
    pub auto_cancel_grace_minutes: i64,
    /// Minutes either side of the scheduled start during which a same-day
    /// check-in is accepted.
    pub checkin_window_minutes: i64,
    /// Appointments must be at least this many years old before an admin
    /// may purge them.
    pub purge_retention_years: u32,
    /// Upper bound for a single wait-timer; longer waits are chained.
    pub max_timer_delay_ms: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            auto_cancel_grace_minutes: 30,
            checkin_window_minutes: 30,
            purge_retention_years: 3,
            // Largest delay a 32-bit millisecond timer can represent.
            max_timer_delay_ms: 2_147_483_647,
        }
    }
}

impl LifecycleSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            auto_cancel_grace_minutes: parse_env(
                "AUTO_CANCEL_GRACE_MINUTES",
                defaults.auto_cancel_grace_minutes,
            ),
            checkin_window_minutes: parse_env(
                "CHECKIN_WINDOW_MINUTES",
                defaults.checkin_window_minutes,
            ),
            purge_retention_years: parse_env(
                "PURGE_RETENTION_YEARS",
                defaults.purge_retention_years,
            ),
            max_timer_delay_ms: parse_env("MAX_TIMER_DELAY_MS", defaults.max_timer_delay_ms),
        }
    }
}

fn parse_env<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid value, using default", name);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("CLINIC_STORE_URL").unwrap_or_else(|_| {
                warn!("CLINIC_STORE_URL not set, using empty value");
                String::new()
            }),
            store_api_key: env::var("CLINIC_STORE_API_KEY").unwrap_or_else(|_| {
                warn!("CLINIC_STORE_API_KEY not set, using empty value");
                String::new()
            }),
            jwt_secret: env::var("CLINIC_JWT_SECRET").unwrap_or_else(|_| {
                warn!("CLINIC_JWT_SECRET not set, using empty value");
                String::new()
            }),
            lifecycle: LifecycleSettings::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty() && !self.store_api_key.is_empty() && !self.jwt_secret.is_empty()
    }
}
