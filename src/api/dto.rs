//! JSON shapes of the HTTP surface. Field names are camelCase on the wire.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::{NewService, ServicePatch};
use crate::model::*;

// ── Requests ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub service_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingBody {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_phone: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub start_time: String,
    pub notes: Option<String>,
}

impl From<BookingBody> for BookingRequest {
    fn from(body: BookingBody) -> Self {
        Self {
            id: None,
            client_name: body.client_name,
            client_phone: body.client_phone,
            service_id: body.service_id,
            date: body.date,
            start_time: body.start_time,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceBody {
    pub id: Option<Ulid>,
    #[serde(default)]
    pub name: String,
    pub duration_minutes: Option<Minutes>,
    pub price: Option<u32>,
    pub color: Option<String>,
    pub active: Option<bool>,
}

impl CreateServiceBody {
    pub fn into_new_service(self) -> Option<NewService> {
        let duration_minutes = self.duration_minutes.filter(|d| *d != 0)?;
        if self.name.trim().is_empty() {
            return None;
        }
        Some(NewService {
            id: self.id,
            name: self.name,
            duration_minutes,
            price: self.price,
            color: self.color,
            active: self.active,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchServiceBody {
    pub name: Option<String>,
    pub duration_minutes: Option<Minutes>,
    pub price: Option<u32>,
    pub color: Option<String>,
    pub active: Option<bool>,
}

impl From<PatchServiceBody> for ServicePatch {
    fn from(body: PatchServiceBody) -> Self {
        Self {
            name: body.name,
            duration_minutes: body.duration_minutes,
            price: body.price,
            color: body.color,
            active: body.active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleBody {
    #[serde(default)]
    pub blocks: Vec<BlockInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentsQuery {
    pub date: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionBody {
    #[serde(default)]
    pub action: String,
}

// ── Responses ────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicServiceDto {
    pub id: Ulid,
    pub name: String,
    pub duration_minutes: Minutes,
    pub price: u32,
    pub color: String,
}

impl From<Service> for PublicServiceDto {
    fn from(s: Service) -> Self {
        Self {
            id: s.id,
            name: s.name,
            duration_minutes: s.duration_minutes,
            price: s.price,
            color: s.color,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDto {
    pub id: Ulid,
    pub name: String,
    pub duration_minutes: Minutes,
    pub price: u32,
    pub color: String,
    pub active: bool,
}

impl From<Service> for ServiceDto {
    fn from(s: Service) -> Self {
        Self {
            id: s.id,
            name: s.name,
            duration_minutes: s.duration_minutes,
            price: s.price,
            color: s.color,
            active: s.active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<ServiceDto>,
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub slots: Vec<Slot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub ok: bool,
    pub appointment_id: Ulid,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub days: Vec<ScheduleDayInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDto {
    pub id: Ulid,
    pub client_name: String,
    pub client_phone: String,
    pub service_id: Ulid,
    pub service_name: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub status: AppointmentStatus,
    pub notes: String,
    pub created_at: Ms,
    pub reminder_sent_at: Option<Ms>,
}

impl From<AppointmentInfo> for AppointmentDto {
    fn from(info: AppointmentInfo) -> Self {
        let a = info.appointment;
        Self {
            start_time: a.start_time(),
            end_time: a.end_time(),
            id: a.id,
            client_name: a.client_name,
            client_phone: a.client_phone,
            service_id: a.service_id,
            service_name: info.service_name.unwrap_or_else(|| "Service".to_string()),
            date: a.date,
            status: a.status,
            notes: a.notes.unwrap_or_default(),
            created_at: a.created_at,
            reminder_sent_at: a.reminder_sent_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<AppointmentDto>,
}

#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub appointment: AppointmentDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub status: AppointmentStatus,
    pub changed: bool,
    pub message: String,
    pub wa_url: String,
}
