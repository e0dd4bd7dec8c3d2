use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;
use crate::observability::AVAILABILITY_QUERIES_TOTAL;
use crate::timeofday::{parse_date, weekday};

use super::availability::generate_slots;
use super::conflict::require;
use super::{Engine, EngineError};

impl Engine {
    /// Free slots for a service on a date: the weekday's blocks stepped by the
    /// configured step, minus the date's busy appointments. A closed weekday
    /// or a date before bookings open yields an empty list.
    pub async fn compute_availability(
        &self,
        date: &str,
        service_id: &str,
    ) -> Result<Vec<Slot>, EngineError> {
        require(&[("date", date), ("serviceId", service_id)])?;
        let date = parse_date(date).ok_or_else(|| EngineError::InvalidDate(date.to_string()))?;
        let service = service_id
            .trim()
            .parse::<Ulid>()
            .ok()
            .and_then(|id| self.store.get_service(&id))
            .ok_or_else(|| EngineError::ServiceNotFound(service_id.trim().to_string()))?;
        metrics::counter!(AVAILABILITY_QUERIES_TOTAL).increment(1);

        if self.policy.booking_opens_on.is_some_and(|opens| date < opens) {
            return Ok(Vec::new());
        }
        let blocks = self.store.blocks_for(weekday(date));
        if blocks.is_empty() {
            return Ok(Vec::new());
        }
        let busy = match self.store.get_day(&date) {
            Some(day) => day.read().await.busy(),
            None => Vec::new(),
        };

        // Only offer what a booking would accept.
        let granularity = self.policy.slot_granularity;
        Ok(generate_slots(
            &blocks,
            service.duration_minutes,
            &busy,
            self.policy.slot_step,
            self.policy.normalize_blocks,
        )
        .into_iter()
        .filter(|slot| granularity <= 0 || slot.start % granularity == 0)
        .map(Slot::from)
        .collect())
    }

    /// Services sorted by name; `active_only` hides the retired ones.
    pub fn list_services(&self, active_only: bool) -> Vec<Service> {
        let mut services: Vec<Service> = self
            .store
            .services()
            .into_iter()
            .filter(|s| !active_only || s.active)
            .collect();
        services.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        services
    }

    pub fn get_service(&self, id: &Ulid) -> Option<Service> {
        self.store.get_service(id)
    }

    /// All seven weekdays, closed days with no blocks.
    pub fn schedule(&self) -> Vec<ScheduleDayInfo> {
        (0..7u8)
            .map(|weekday| ScheduleDayInfo {
                weekday,
                blocks: self
                    .store
                    .blocks_for(weekday)
                    .into_iter()
                    .map(Slot::from)
                    .collect(),
            })
            .collect()
    }

    /// Appointments sorted by (date, start), optionally restricted to one date
    /// and one status. `status: None` returns every status.
    pub async fn list_appointments(
        &self,
        date: Option<NaiveDate>,
        status: Option<AppointmentStatus>,
    ) -> Vec<AppointmentInfo> {
        let dates = match date {
            Some(d) => vec![d],
            None => self.store.dates(),
        };
        let mut result = Vec::new();
        for date in dates {
            let Some(day) = self.store.get_day(&date) else {
                continue;
            };
            let guard = day.read().await;
            result.extend(
                guard
                    .appointments
                    .iter()
                    .filter(|a| status.is_none_or(|s| a.status == s))
                    .map(|a| AppointmentInfo {
                        service_name: self.store.service_name(&a.service_id),
                        appointment: a.clone(),
                    }),
            );
        }
        result
    }

    pub async fn get_appointment(&self, id: Ulid) -> Result<AppointmentInfo, EngineError> {
        let date = self
            .store
            .date_of_appointment(&id)
            .ok_or(EngineError::NotFound(id))?;
        let day = self.store.get_day(&date).ok_or(EngineError::NotFound(id))?;
        let guard = day.read().await;
        let appointment = guard.get(id).cloned().ok_or(EngineError::NotFound(id))?;
        Ok(AppointmentInfo {
            service_name: self.store.service_name(&appointment.service_id),
            appointment,
        })
    }
}
