use chrono::NaiveDate;
use tokio::sync::oneshot;
use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::message::{MessageContext, MessageKind};
use crate::model::*;
use crate::observability::{error_label, BOOKINGS_TOTAL, TRANSITIONS_TOTAL, WAL_COMPACTIONS_TOTAL};
use crate::timeofday::{minutes_to_time, parse_date, time_to_minutes, weekday};

use super::availability::within_blocks;
use super::conflict::{check_no_conflict, now_ms, require, validate_booking_lengths, validate_service_fields};
use super::{Engine, EngineError, SharedDayState, WalCommand};

pub const DEFAULT_SERVICE_COLOR: &str = "#e87dad";

/// A new service as submitted by the admin. Unset fields take the defaults:
/// price 0, the studio pink, active.
#[derive(Debug, Clone, Default)]
pub struct NewService {
    pub id: Option<Ulid>,
    pub name: String,
    pub duration_minutes: Minutes,
    pub price: Option<u32>,
    pub color: Option<String>,
    pub active: Option<bool>,
}

/// Partial update of a service. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub duration_minutes: Option<Minutes>,
    pub price: Option<u32>,
    pub color: Option<String>,
    pub active: Option<bool>,
}

/// Result of an admin action: the appointment after the action, whether its
/// status changed, and the data for the client-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub appointment: Appointment,
    pub changed: bool,
    pub message: MessageContext,
}

/// The state machine. `Ok(None)` means the action leaves the status as is.
fn next_status(
    from: AppointmentStatus,
    action: AdminAction,
) -> Result<Option<AppointmentStatus>, EngineError> {
    use AppointmentStatus::*;
    match (action, from) {
        (AdminAction::Confirm, Request) => Ok(Some(Confirmed)),
        (AdminAction::Confirm, Confirmed) => Ok(None),
        (AdminAction::Reject, Request) => Ok(Some(Rejected)),
        (AdminAction::Reject, Rejected) => Ok(None),
        (AdminAction::Cancel, Cancelled) => Ok(None),
        (AdminAction::Cancel, _) => Ok(Some(Cancelled)),
        (AdminAction::Resend | AdminAction::Remind, _) => Ok(None),
        (action, from) => Err(EngineError::InvalidTransition {
            from,
            action: action.as_str(),
        }),
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Engine {
    // ── Services ─────────────────────────────────────────────

    pub async fn create_service(&self, new: NewService) -> Result<Service, EngineError> {
        let color = non_blank(new.color).unwrap_or_else(|| DEFAULT_SERVICE_COLOR.to_string());
        let name = new.name.trim().to_string();
        validate_service_fields(&name, new.duration_minutes, &color)?;

        let _permit = self.write_permit().await;
        let _catalog = self.catalog_lock.lock().await;
        if self.store.service_count() >= MAX_SERVICES {
            return Err(EngineError::LimitExceeded("too many services"));
        }
        let id = new.id.unwrap_or_else(Ulid::new);
        if self.store.contains_service(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let service = Service {
            id,
            name,
            duration_minutes: new.duration_minutes,
            price: new.price.unwrap_or(0),
            color,
            active: new.active.unwrap_or(true),
        };
        let event = Event::ServiceCreated {
            service: service.clone(),
        };
        self.persist_and_apply_catalog(&event).await?;
        info!("service {} created: {:?}", service.id, service.name);
        Ok(service)
    }

    /// Apply a partial update. Existing appointments keep their stored end times.
    pub async fn update_service(&self, id: Ulid, patch: ServicePatch) -> Result<Service, EngineError> {
        let _permit = self.write_permit().await;
        let _catalog = self.catalog_lock.lock().await;
        let mut service = self.store.get_service(&id).ok_or(EngineError::NotFound(id))?;

        if let Some(name) = patch.name {
            service.name = name.trim().to_string();
        }
        if let Some(duration) = patch.duration_minutes {
            service.duration_minutes = duration;
        }
        if let Some(price) = patch.price {
            service.price = price;
        }
        if let Some(color) = non_blank(patch.color) {
            service.color = color;
        }
        if let Some(active) = patch.active {
            service.active = active;
        }
        validate_service_fields(&service.name, service.duration_minutes, &service.color)?;

        let event = Event::ServiceUpdated {
            service: service.clone(),
        };
        self.persist_and_apply_catalog(&event).await?;
        info!("service {id} updated");
        Ok(service)
    }

    // ── Weekly schedule ──────────────────────────────────────

    /// Replace the open blocks of one weekday (0 = Sunday). Blocks with a
    /// blank bound are dropped; an empty list closes the day.
    pub async fn set_schedule_day(
        &self,
        weekday: i64,
        blocks: &[BlockInput],
    ) -> Result<ScheduleDayInfo, EngineError> {
        let day = u8::try_from(weekday)
            .ok()
            .filter(|d| *d <= 6)
            .ok_or_else(|| EngineError::InvalidWeekday(weekday.to_string()))?;

        let mut spans = Vec::new();
        for block in blocks {
            if block.start.trim().is_empty() || block.end.trim().is_empty() {
                continue;
            }
            let start = time_to_minutes(&block.start)
                .map_err(|_| EngineError::InvalidTime(block.start.clone()))?;
            let end = time_to_minutes(&block.end)
                .map_err(|_| EngineError::InvalidTime(block.end.clone()))?;
            if start >= end {
                return Err(EngineError::InvalidTime(format!(
                    "{}-{}",
                    block.start, block.end
                )));
            }
            let granularity = self.policy.slot_granularity;
            if granularity > 0 && start % granularity != 0 {
                return Err(EngineError::InvalidSlot(format!(
                    "block start {} is not on the {granularity}-minute grid",
                    block.start.trim()
                )));
            }
            spans.push(Span::new(start, end));
        }
        if spans.len() > MAX_BLOCKS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many blocks in a day"));
        }

        let _permit = self.write_permit().await;
        let _catalog = self.catalog_lock.lock().await;
        let event = Event::ScheduleDaySet {
            weekday: day,
            blocks: spans.clone(),
        };
        self.persist_and_apply_catalog(&event).await?;
        info!("schedule for weekday {day} set to {} blocks", spans.len());
        Ok(ScheduleDayInfo {
            weekday: day,
            blocks: spans.into_iter().map(Slot::from).collect(),
        })
    }

    // ── Booking transaction ──────────────────────────────────

    /// Validate a client's request and, if the time is still free, record it
    /// with status `request`. The overlap check, log append and insert all
    /// happen under the date's write lock.
    pub async fn request_booking(&self, req: BookingRequest) -> Result<Appointment, EngineError> {
        let result = self.try_request_booking(req).await;
        let outcome = match &result {
            Ok(appt) => {
                info!(
                    "appointment {} requested for {} {}-{}",
                    appt.id,
                    appt.date,
                    appt.start_time(),
                    appt.end_time()
                );
                "ok"
            }
            Err(e) => {
                debug!("booking refused: {e}");
                error_label(e)
            }
        };
        metrics::counter!(BOOKINGS_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    async fn try_request_booking(&self, req: BookingRequest) -> Result<Appointment, EngineError> {
        require(&[
            ("clientName", req.client_name.as_str()),
            ("clientPhone", req.client_phone.as_str()),
            ("serviceId", req.service_id.as_str()),
            ("date", req.date.as_str()),
            ("startTime", req.start_time.as_str()),
        ])?;

        let start = time_to_minutes(&req.start_time)
            .map_err(|_| EngineError::InvalidTime(req.start_time.clone()))?;
        let date: NaiveDate =
            parse_date(&req.date).ok_or_else(|| EngineError::InvalidDate(req.date.clone()))?;
        let granularity = self.policy.slot_granularity;
        if granularity > 0 && start % granularity != 0 {
            return Err(EngineError::InvalidSlot(format!(
                "{} is not on the {granularity}-minute grid",
                req.start_time.trim()
            )));
        }
        if let Some(opens) = self.policy.booking_opens_on
            && date < opens {
                return Err(EngineError::BookingClosed(opens));
            }

        let service = req
            .service_id
            .trim()
            .parse::<Ulid>()
            .ok()
            .and_then(|id| self.store.get_service(&id))
            .ok_or_else(|| EngineError::ServiceNotFound(req.service_id.trim().to_string()))?;

        let end = start + service.duration_minutes;
        if end > MINUTES_PER_DAY {
            return Err(EngineError::InvalidSlot(format!(
                "{} plus {} minutes runs past midnight",
                req.start_time.trim(),
                service.duration_minutes
            )));
        }
        validate_booking_lengths(&req)?;
        let span = Span::new(start, end);
        let id = req.id.unwrap_or_else(Ulid::new);

        let appointment = Appointment {
            id,
            client_name: req.client_name.trim().to_string(),
            client_phone: req.client_phone.trim().to_string(),
            service_id: service.id,
            date,
            span,
            status: AppointmentStatus::Request,
            notes: non_blank(req.notes),
            created_at: now_ms(),
            reminder_sent_at: None,
        };

        let _permit = self.write_permit().await;
        let day = self.store.day_or_create(date);
        let result = self.insert_on_day(&day, appointment).await;
        if result.is_err() {
            drop(day);
            self.store.discard_day_if_empty(&date);
        }
        result
    }

    /// The locked half of a booking: every check that depends on what is
    /// already stored, then the append. Caller holds a write permit.
    async fn insert_on_day(
        &self,
        day: &SharedDayState,
        appointment: Appointment,
    ) -> Result<Appointment, EngineError> {
        let mut guard = day.write().await;
        if self.store.date_of_appointment(&appointment.id).is_some() {
            return Err(EngineError::AlreadyExists(appointment.id));
        }
        if guard.appointments.len() >= MAX_APPOINTMENTS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many appointments on this date"));
        }
        let span = appointment.span;
        check_no_conflict(&guard, &span)?;
        if self.policy.enforce_schedule
            && !within_blocks(&self.store.blocks_for(weekday(appointment.date)), &span)
        {
            return Err(EngineError::OutsideSchedule(format!(
                "{}-{} on {}",
                minutes_to_time(span.start),
                minutes_to_time(span.end),
                appointment.date
            )));
        }

        // Ids are unique across dates, and other dates are not under this lock.
        if !self
            .store
            .reserve_appointment_id(appointment.id, appointment.date)
        {
            return Err(EngineError::AlreadyExists(appointment.id));
        }
        let event = Event::AppointmentRequested {
            appointment: appointment.clone(),
        };
        if let Err(e) = self.persist_and_apply(&mut guard, &event).await {
            self.store
                .release_appointment_id(&appointment.id, &appointment.date);
            return Err(e);
        }
        Ok(appointment)
    }

    // ── Admin status transitions ─────────────────────────────

    /// Apply an admin action (`confirm`, `reject`, `cancel`, `resend`,
    /// `remind`) to an appointment.
    pub async fn transition(&self, id: Ulid, action: &str) -> Result<TransitionOutcome, EngineError> {
        let result = self.try_transition(id, action).await;
        let label = AdminAction::parse(action).map_or("unknown", |a| a.as_str());
        let outcome = match &result {
            Ok(outcome) => {
                info!(
                    "appointment {id}: {label} -> {} (changed: {})",
                    outcome.appointment.status, outcome.changed
                );
                "ok"
            }
            Err(e) => {
                debug!("appointment {id}: {label} refused: {e}");
                error_label(e)
            }
        };
        metrics::counter!(TRANSITIONS_TOTAL, "action" => label, "outcome" => outcome).increment(1);
        result
    }

    async fn try_transition(&self, id: Ulid, action: &str) -> Result<TransitionOutcome, EngineError> {
        let _permit = self.write_permit().await;
        let mut guard = self.resolve_appointment_write(&id).await?;
        let current = guard.get(id).cloned().ok_or(EngineError::NotFound(id))?;
        let action =
            AdminAction::parse(action).ok_or_else(|| EngineError::InvalidAction(action.to_string()))?;

        let next = next_status(current.status, action)?;
        if let Some(status) = next {
            let event = Event::AppointmentStatusChanged {
                id,
                date: current.date,
                status,
            };
            self.persist_and_apply(&mut guard, &event).await?;
        }
        if action == AdminAction::Remind {
            let event = Event::ReminderSent {
                id,
                date: current.date,
                at: now_ms(),
            };
            self.persist_and_apply(&mut guard, &event).await?;
        }

        let appointment = guard.get(id).cloned().ok_or(EngineError::NotFound(id))?;
        let kind = match action {
            AdminAction::Remind => MessageKind::Reminder,
            _ => MessageKind::for_status(appointment.status),
        };
        let service_name = self.store.service_name(&appointment.service_id);
        Ok(TransitionOutcome {
            message: MessageContext::new(kind, &appointment, service_name),
            changed: next.is_some(),
            appointment,
        })
    }

    // ── WAL maintenance ──────────────────────────────────────

    /// Compact the WAL by rewriting it with only the events needed to recreate the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _exclusive = self.write_gate.write().await;

        let mut events = Vec::new();
        let mut services = self.store.services();
        services.sort_by_key(|s| s.id);
        events.extend(
            services
                .into_iter()
                .map(|service| Event::ServiceCreated { service }),
        );
        for weekday in 0..7u8 {
            let blocks = self.store.blocks_for(weekday);
            if !blocks.is_empty() {
                events.push(Event::ScheduleDaySet { weekday, blocks });
            }
        }
        for date in self.store.dates() {
            let Some(day) = self.store.get_day(&date) else {
                continue;
            };
            let guard = day.read().await;
            events.extend(guard.appointments.iter().map(|a| Event::AppointmentRequested {
                appointment: a.clone(),
            }));
        }

        let count = events.len();
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        metrics::counter!(WAL_COMPACTIONS_TOTAL).increment(1);
        info!("WAL compacted to {count} events");
        Ok(())
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
