use std::net::SocketAddr;

use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total HTTP requests. Labels: method, route, status.
pub const HTTP_REQUESTS_TOTAL: &str = "studiobook_http_requests_total";

/// Histogram: HTTP request latency in seconds. Labels: method, route.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "studiobook_http_request_duration_seconds";

/// Counter: booking attempts. Labels: outcome (`ok` or an error label).
pub const BOOKINGS_TOTAL: &str = "studiobook_bookings_total";

/// Counter: admin actions on appointments. Labels: action, outcome.
pub const TRANSITIONS_TOTAL: &str = "studiobook_transitions_total";

/// Counter: availability computations.
pub const AVAILABILITY_QUERIES_TOTAL: &str = "studiobook_availability_queries_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: live admin sessions.
pub const SESSIONS_ACTIVE: &str = "studiobook_sessions_active";

/// Counter: rejected admin logins.
pub const LOGIN_FAILURES_TOTAL: &str = "studiobook_login_failures_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "studiobook_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "studiobook_wal_flush_batch_size";

/// Counter: completed WAL compactions.
pub const WAL_COMPACTIONS_TOTAL: &str = "studiobook_wal_compactions_total";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Low-cardinality label for an engine failure.
pub fn error_label(err: &EngineError) -> &'static str {
    match err {
        EngineError::MissingFields(_) => "missing_fields",
        EngineError::InvalidTime(_) => "invalid_time",
        EngineError::InvalidDate(_) => "invalid_date",
        EngineError::InvalidSlot(_) => "invalid_slot",
        EngineError::InvalidWeekday(_) => "invalid_weekday",
        EngineError::BookingClosed(_) => "booking_closed",
        EngineError::ServiceNotFound(_) => "service_not_found",
        EngineError::TimeUnavailable(_) => "time_unavailable",
        EngineError::OutsideSchedule(_) => "outside_schedule",
        EngineError::NotFound(_) => "not_found",
        EngineError::AlreadyExists(_) => "already_exists",
        EngineError::InvalidAction(_) => "invalid_action",
        EngineError::InvalidTransition { .. } => "invalid_transition",
        EngineError::LimitExceeded(_) => "limit_exceeded",
        EngineError::WalError(_) => "wal_error",
    }
}
