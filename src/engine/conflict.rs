use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    chrono::Utc::now().timestamp_millis()
}

/// Collect the names of blank required fields, in declaration order.
pub(crate) fn require(fields: &[(&'static str, &str)]) -> Result<(), EngineError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EngineError::MissingFields(missing))
    }
}

pub(crate) fn validate_booking_lengths(req: &BookingRequest) -> Result<(), EngineError> {
    if req.client_name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("client name too long"));
    }
    if req.client_phone.len() > MAX_PHONE_LEN {
        return Err(EngineError::LimitExceeded("phone too long"));
    }
    if let Some(ref notes) = req.notes
        && notes.len() > MAX_NOTES_LEN {
            return Err(EngineError::LimitExceeded("notes too long"));
        }
    Ok(())
}

pub(crate) fn validate_service_fields(
    name: &str,
    duration_minutes: Minutes,
    color: &str,
) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::MissingFields(vec!["name"]));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("service name too long"));
    }
    if color.len() > MAX_COLOR_LEN {
        return Err(EngineError::LimitExceeded("color too long"));
    }
    if duration_minutes <= 0 || duration_minutes > MAX_DURATION_MINUTES {
        return Err(EngineError::LimitExceeded("duration out of range"));
    }
    Ok(())
}

/// The busy-interval guard: refuse `span` when a request or confirmed
/// appointment of the same day overlaps it. Caller holds the day's write lock.
pub(crate) fn check_no_conflict(day: &DayState, span: &Span) -> Result<(), EngineError> {
    match day.first_busy_overlap(span) {
        Some(existing) => Err(EngineError::TimeUnavailable(existing.id)),
        None => Ok(()),
    }
}
