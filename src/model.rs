use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::timeofday::minutes_to_time;

/// Minutes since local midnight. The only time-of-day type.
pub type Minutes = i32;

/// Unix milliseconds, used for record timestamps only.
pub type Ms = i64;

/// Half-open interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Minutes,
    pub end: Minutes,
}

impl Span {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> Minutes {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Request,
    Confirmed,
    Cancelled,
    Rejected,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Request => "request",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "request" => Some(AppointmentStatus::Request),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "rejected" => Some(AppointmentStatus::Rejected),
            _ => None,
        }
    }

    /// Whether an appointment in this status occupies its time range.
    pub fn is_busy(&self) -> bool {
        matches!(self, AppointmentStatus::Request | AppointmentStatus::Confirmed)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Ulid,
    pub name: String,
    pub duration_minutes: Minutes,
    pub price: u32,
    pub color: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Ulid,
    pub client_name: String,
    pub client_phone: String,
    pub service_id: Ulid,
    pub date: NaiveDate,
    /// `span.end` is fixed at creation from the service duration at that time.
    pub span: Span,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: Ms,
    pub reminder_sent_at: Option<Ms>,
}

impl Appointment {
    pub fn start_time(&self) -> String {
        minutes_to_time(self.span.start)
    }

    pub fn end_time(&self) -> String {
        minutes_to_time(self.span.end)
    }
}

/// All appointments of one date, sorted by `span.start`. This is the unit of
/// locking for the booking transaction.
#[derive(Debug, Clone)]
pub struct DayState {
    pub date: NaiveDate,
    pub appointments: Vec<Appointment>,
}

impl DayState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            appointments: Vec::new(),
        }
    }

    /// Insert maintaining sort order by span.start.
    pub fn insert(&mut self, appointment: Appointment) {
        let pos = self
            .appointments
            .partition_point(|a| a.span.start <= appointment.span.start);
        self.appointments.insert(pos, appointment);
    }

    pub fn get(&self, id: Ulid) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: Ulid) -> Option<&mut Appointment> {
        self.appointments.iter_mut().find(|a| a.id == id)
    }

    /// Busy spans (request + confirmed), ascending by start.
    pub fn busy(&self) -> Vec<Span> {
        self.appointments
            .iter()
            .filter(|a| a.status.is_busy())
            .map(|a| a.span)
            .collect()
    }

    /// First busy appointment overlapping `query`, if any.
    /// Uses binary search to skip appointments starting at or after `query.end`.
    pub fn first_busy_overlap(&self, query: &Span) -> Option<&Appointment> {
        let right_bound = self
            .appointments
            .partition_point(|a| a.span.start < query.end);
        self.appointments[..right_bound]
            .iter()
            .find(|a| a.status.is_busy() && a.span.end > query.start)
    }
}

/// One committed state change. This is the log record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ServiceCreated {
        service: Service,
    },
    ServiceUpdated {
        service: Service,
    },
    ScheduleDaySet {
        weekday: u8,
        blocks: Vec<Span>,
    },
    AppointmentRequested {
        appointment: Appointment,
    },
    AppointmentStatusChanged {
        id: Ulid,
        date: NaiveDate,
        status: AppointmentStatus,
    },
    ReminderSent {
        id: Ulid,
        date: NaiveDate,
        at: Ms,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ServiceCreated { .. } => "service_created",
            Event::ServiceUpdated { .. } => "service_updated",
            Event::ScheduleDaySet { .. } => "schedule_day_set",
            Event::AppointmentRequested { .. } => "appointment_requested",
            Event::AppointmentStatusChanged { .. } => "appointment_status_changed",
            Event::ReminderSent { .. } => "reminder_sent",
        }
    }
}

/// A client's booking request as it arrives, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingRequest {
    /// Client-chosen id; generated when absent.
    pub id: Option<Ulid>,
    pub client_name: String,
    pub client_phone: String,
    pub service_id: String,
    pub date: String,
    pub start_time: String,
    pub notes: Option<String>,
}

/// One opening block as the admin form submits it. Blocks with a blank end
/// are dropped on upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BlockInput {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

impl BlockInput {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

/// Admin operations on an existing appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Confirm,
    Reject,
    Cancel,
    /// Re-issue the message for the current status.
    Resend,
    Remind,
}

impl AdminAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "confirm" => Some(AdminAction::Confirm),
            "reject" => Some(AdminAction::Reject),
            "cancel" => Some(AdminAction::Cancel),
            "resend" => Some(AdminAction::Resend),
            "remind" => Some(AdminAction::Remind),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::Confirm => "confirm",
            AdminAction::Reject => "reject",
            AdminAction::Cancel => "cancel",
            AdminAction::Resend => "resend",
            AdminAction::Remind => "remind",
        }
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start_time: String,
    pub end_time: String,
}

impl From<Span> for Slot {
    fn from(span: Span) -> Self {
        Self {
            start_time: minutes_to_time(span.start),
            end_time: minutes_to_time(span.end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDayInfo {
    pub weekday: u8,
    pub blocks: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentInfo {
    pub appointment: Appointment,
    pub service_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()
    }

    fn appt(start: Minutes, end: Minutes, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Ulid::new(),
            client_name: "Ana".into(),
            client_phone: "+54 11 5555-0000".into(),
            service_id: Ulid::new(),
            date: date(),
            span: Span::new(start, end),
            status,
            notes: None,
            created_at: 0,
            reminder_sent_at: None,
        }
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(600, 660);
        let b = Span::new(630, 690);
        let c = Span::new(660, 720);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
    }

    #[test]
    fn span_overlap_is_symmetric() {
        let spans = [
            Span::new(0, 30),
            Span::new(15, 45),
            Span::new(30, 60),
            Span::new(0, 120),
            Span::new(59, 61),
        ];
        for a in &spans {
            for b in &spans {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn span_contains_span() {
        let outer = Span::new(540, 720);
        assert!(outer.contains_span(&Span::new(540, 600)));
        assert!(outer.contains_span(&outer));
        assert!(!outer.contains_span(&Span::new(690, 750)));
    }

    #[test]
    fn status_round_trip_and_busy() {
        for s in [
            AppointmentStatus::Request,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Rejected,
        ] {
            assert_eq!(AppointmentStatus::parse(s.as_str()), Some(s));
        }
        assert!(AppointmentStatus::Request.is_busy());
        assert!(AppointmentStatus::Confirmed.is_busy());
        assert!(!AppointmentStatus::Cancelled.is_busy());
        assert!(!AppointmentStatus::Rejected.is_busy());
        assert_eq!(AppointmentStatus::parse("pending"), None);
    }

    #[test]
    fn admin_action_parse() {
        assert_eq!(AdminAction::parse("confirm"), Some(AdminAction::Confirm));
        assert_eq!(AdminAction::parse(" remind "), Some(AdminAction::Remind));
        assert_eq!(AdminAction::parse("delete"), None);
        assert_eq!(AdminAction::parse("Confirm"), None);
    }

    #[test]
    fn day_keeps_appointments_sorted() {
        let mut day = DayState::new(date());
        day.insert(appt(720, 750, AppointmentStatus::Request));
        day.insert(appt(540, 570, AppointmentStatus::Request));
        day.insert(appt(600, 630, AppointmentStatus::Confirmed));
        let starts: Vec<_> = day.appointments.iter().map(|a| a.span.start).collect();
        assert_eq!(starts, vec![540, 600, 720]);
    }

    #[test]
    fn busy_skips_released_appointments() {
        let mut day = DayState::new(date());
        day.insert(appt(540, 570, AppointmentStatus::Cancelled));
        day.insert(appt(600, 630, AppointmentStatus::Confirmed));
        day.insert(appt(660, 690, AppointmentStatus::Rejected));
        assert_eq!(day.busy(), vec![Span::new(600, 630)]);
    }

    #[test]
    fn first_busy_overlap_finds_conflict() {
        let mut day = DayState::new(date());
        let confirmed = appt(600, 630, AppointmentStatus::Confirmed);
        let id = confirmed.id;
        day.insert(appt(600, 630, AppointmentStatus::Cancelled));
        day.insert(confirmed);

        let hit = day.first_busy_overlap(&Span::new(600, 630)).unwrap();
        assert_eq!(hit.id, id);
        // adjacent is free
        assert!(day.first_busy_overlap(&Span::new(630, 660)).is_none());
        assert!(day.first_busy_overlap(&Span::new(570, 600)).is_none());
    }

    #[test]
    fn first_busy_overlap_long_appointment_spanning_query() {
        let mut day = DayState::new(date());
        day.insert(appt(540, 720, AppointmentStatus::Request));
        assert!(day.first_busy_overlap(&Span::new(600, 630)).is_some());
    }

    #[test]
    fn slot_renders_wall_clock() {
        let slot = Slot::from(Span::new(540, 600));
        assert_eq!(slot.start_time, "09:00");
        assert_eq!(slot.end_time, "10:00");
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::AppointmentRequested {
            appointment: appt(600, 630, AppointmentStatus::Request),
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
