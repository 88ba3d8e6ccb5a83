// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use shared_config::LifecycleSettings;
use shared_store::StoreError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    /// Scheduled start of the visit, always an absolute instant.
    pub date_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    CheckedIn,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Terminal statuses accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::CheckedIn => "checked-in",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "checked-in" => Ok(AppointmentStatus::CheckedIn),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentError::Validation(format!(
                "Unknown appointment status: {}",
                other
            ))),
        }
    }
}

/// Which statuses a listing accepts. Always a set, never a parsed compound
/// string: the historical "checked-in&status=scheduled" filter becomes
/// `StatusFilter::any_of([CheckedIn, Scheduled])` at the API boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusFilter {
    All,
    Only(Vec<AppointmentStatus>),
}

impl StatusFilter {
    pub fn all() -> Self {
        StatusFilter::All
    }

    pub fn only(status: AppointmentStatus) -> Self {
        StatusFilter::Only(vec![status])
    }

    pub fn any_of<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = AppointmentStatus>,
    {
        StatusFilter::Only(statuses.into_iter().collect())
    }

    pub fn accepts(&self, status: &AppointmentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(statuses) => statuses.contains(status),
        }
    }

    /// Accepts "all", a single status, or a comma-separated union such as
    /// "scheduled,checked-in". `None` means no filtering.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppointmentError> {
        match raw {
            None | Some("all") | Some("") => Ok(StatusFilter::All),
            Some(list) => {
                let statuses = list
                    .split(',')
                    .map(|part| part.trim().parse())
                    .collect::<Result<Vec<AppointmentStatus>, _>>()?;
                Ok(StatusFilter::Only(statuses))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppointmentError> {
        match raw {
            None | Some("asc") => Ok(SortOrder::Asc),
            Some("desc") => Ok(SortOrder::Desc),
            Some(other) => Err(AppointmentError::Validation(format!(
                "Unknown sort order: {}",
                other
            ))),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<StatusFilter>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub sort: Option<SortOrder>,
}

// ==============================================================================
// LIFECYCLE RULES
// ==============================================================================

/// Product durations governing the lifecycle guards. Sourced from
/// configuration; the defaults match the historical product behavior.
#[derive(Debug, Clone)]
pub struct LifecycleRules {
    pub auto_cancel_grace_minutes: i64,
    pub checkin_window_minutes: i64,
    pub purge_retention_years: u32,
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            auto_cancel_grace_minutes: 30,
            checkin_window_minutes: 30,
            purge_retention_years: 3,
        }
    }
}

impl From<&LifecycleSettings> for LifecycleRules {
    fn from(settings: &LifecycleSettings) -> Self {
        Self {
            auto_cancel_grace_minutes: settings.auto_cancel_grace_minutes,
            checkin_window_minutes: settings.checkin_window_minutes,
            purge_retention_years: settings.purge_retention_years,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment cannot move from {from} to {to}")]
    TransitionRejected {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Not authorized: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
