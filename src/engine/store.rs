use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::SharedDayState;

/// All live studio state. Services and the weekly schedule are plain maps;
/// appointments are grouped per date behind a lock per date.
pub struct InMemoryStore {
    services: DashMap<Ulid, Service>,
    schedule: DashMap<u8, Vec<Span>>,
    days: DashMap<NaiveDate, SharedDayState>,
    appointment_day: DashMap<Ulid, NaiveDate>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            schedule: DashMap::new(),
            days: DashMap::new(),
            appointment_day: DashMap::new(),
        }
    }

    // ── Services ─────────────────────────────────────────────

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn get_service(&self, id: &Ulid) -> Option<Service> {
        self.services.get(id).map(|e| e.value().clone())
    }

    pub fn contains_service(&self, id: &Ulid) -> bool {
        self.services.contains_key(id)
    }

    pub fn services(&self) -> Vec<Service> {
        self.services.iter().map(|e| e.value().clone()).collect()
    }

    pub fn service_name(&self, id: &Ulid) -> Option<String> {
        self.services.get(id).map(|e| e.value().name.clone())
    }

    // ── Weekly schedule ──────────────────────────────────────

    /// Open blocks of a weekday as stored. Empty means closed.
    pub fn blocks_for(&self, weekday: u8) -> Vec<Span> {
        self.schedule
            .get(&weekday)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    // ── Days ─────────────────────────────────────────────────

    pub fn get_day(&self, date: &NaiveDate) -> Option<SharedDayState> {
        self.days.get(date).map(|e| e.value().clone())
    }

    /// The day's shared state, creating an empty one on first use.
    pub fn day_or_create(&self, date: NaiveDate) -> SharedDayState {
        self.days
            .entry(date)
            .or_insert_with(|| Arc::new(RwLock::new(DayState::new(date))))
            .value()
            .clone()
    }

    /// Every known date, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.days.iter().map(|e| *e.key()).collect();
        dates.sort();
        dates
    }

    /// Drop a date's entry if it holds no appointments and nobody else holds
    /// its handle. Callers must have released their own clone first.
    pub fn discard_day_if_empty(&self, date: &NaiveDate) -> bool {
        self.days
            .remove_if(date, |_, day| {
                Arc::strong_count(day) == 1
                    && day.try_read().is_ok_and(|d| d.appointments.is_empty())
            })
            .is_some()
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    /// Claim an appointment id for `date`. False when the id is already taken,
    /// on any date.
    pub fn reserve_appointment_id(&self, id: Ulid, date: NaiveDate) -> bool {
        match self.appointment_day.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(date);
                true
            }
        }
    }

    /// Undo a reservation whose append never made it to the log.
    pub fn release_appointment_id(&self, id: &Ulid, date: &NaiveDate) {
        self.appointment_day.remove_if(id, |_, d| d == date);
    }

    pub fn date_of_appointment(&self, id: &Ulid) -> Option<NaiveDate> {
        self.appointment_day.get(id).map(|e| *e.value())
    }

    // ── Event application ────────────────────────────────────

    /// Apply a service or schedule event.
    pub fn apply_catalog_event(&self, event: &Event) {
        match event {
            Event::ServiceCreated { service } | Event::ServiceUpdated { service } => {
                self.services.insert(service.id, service.clone());
            }
            Event::ScheduleDaySet { weekday, blocks } => {
                if blocks.is_empty() {
                    self.schedule.remove(weekday);
                } else {
                    self.schedule.insert(*weekday, blocks.clone());
                }
            }
            Event::AppointmentRequested { .. }
            | Event::AppointmentStatusChanged { .. }
            | Event::ReminderSent { .. } => {}
        }
    }

    /// Apply an appointment event to its day. Caller holds the day's write lock.
    pub fn apply_day_event(&self, day: &mut DayState, event: &Event) {
        match event {
            Event::AppointmentRequested { appointment } => {
                self.appointment_day.insert(appointment.id, appointment.date);
                day.insert(appointment.clone());
            }
            Event::AppointmentStatusChanged { id, status, .. } => {
                if let Some(appt) = day.get_mut(*id) {
                    appt.status = *status;
                }
            }
            Event::ReminderSent { id, at, .. } => {
                if let Some(appt) = day.get_mut(*id) {
                    appt.reminder_sent_at = Some(*at);
                }
            }
            Event::ServiceCreated { .. }
            | Event::ServiceUpdated { .. }
            | Event::ScheduleDaySet { .. } => {}
        }
    }
}

/// The date an appointment event belongs to, `None` for catalog events.
pub(super) fn event_date(event: &Event) -> Option<NaiveDate> {
    match event {
        Event::AppointmentRequested { appointment } => Some(appointment.date),
        Event::AppointmentStatusChanged { date, .. } | Event::ReminderSent { date, .. } => {
            Some(*date)
        }
        Event::ServiceCreated { .. }
        | Event::ServiceUpdated { .. }
        | Event::ScheduleDaySet { .. } => None,
    }
}
