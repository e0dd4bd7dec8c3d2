use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::AppointmentStatus;

#[derive(Debug)]
pub enum EngineError {
    MissingFields(Vec<&'static str>),
    InvalidTime(String),
    InvalidDate(String),
    InvalidSlot(String),
    InvalidWeekday(String),
    BookingClosed(NaiveDate),
    ServiceNotFound(String),
    TimeUnavailable(Ulid),
    OutsideSchedule(String),
    NotFound(Ulid),
    AlreadyExists(Ulid),
    InvalidAction(String),
    InvalidTransition {
        from: AppointmentStatus,
        action: &'static str,
    },
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    /// Stable machine-readable kind, carried in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::MissingFields(_) => "MISSING_FIELDS",
            EngineError::InvalidTime(_) => "INVALID_TIME",
            EngineError::InvalidDate(_) => "INVALID_DATE",
            EngineError::InvalidSlot(_) => "INVALID_SLOT",
            EngineError::InvalidWeekday(_) => "INVALID_WEEKDAY",
            EngineError::BookingClosed(_) => "BOOKING_CLOSED",
            EngineError::ServiceNotFound(_) => "SERVICE_NOT_FOUND",
            EngineError::TimeUnavailable(_) => "TIME_UNAVAILABLE",
            EngineError::OutsideSchedule(_) => "OUTSIDE_SCHEDULE",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::AlreadyExists(_) => "ALREADY_EXISTS",
            EngineError::InvalidAction(_) => "INVALID_ACTION",
            EngineError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EngineError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            EngineError::WalError(_) => "INTERNAL",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::MissingFields(fields) => {
                write!(f, "missing required fields: {}", fields.join(", "))
            }
            EngineError::InvalidTime(t) => write!(f, "invalid time: {t:?}"),
            EngineError::InvalidDate(d) => write!(f, "invalid date: {d:?} (expected YYYY-MM-DD)"),
            EngineError::InvalidSlot(msg) => write!(f, "invalid slot: {msg}"),
            EngineError::InvalidWeekday(w) => write!(f, "invalid weekday {w:?}: expected 0..=6"),
            EngineError::BookingClosed(opens) => {
                write!(f, "bookings open on {}", opens.format("%Y-%m-%d"))
            }
            EngineError::ServiceNotFound(id) => write!(f, "service not found: {id}"),
            EngineError::TimeUnavailable(_) => write!(f, "the requested time is no longer available"),
            EngineError::OutsideSchedule(msg) => write!(f, "outside opening hours: {msg}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::InvalidAction(a) => write!(f, "invalid action: {a:?}"),
            EngineError::InvalidTransition { from, action } => {
                write!(f, "cannot {action} an appointment that is {from}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
