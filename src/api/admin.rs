use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use ulid::Ulid;

use super::dto::*;
use super::error::ApiError;
use super::AppState;
use crate::engine::EngineError;
use crate::message::{render, whatsapp_link};
use crate::model::AppointmentStatus;
use crate::timeofday::parse_date;

fn parse_id(raw: &str) -> Result<Ulid, ApiError> {
    raw.parse::<Ulid>()
        .map_err(|_| ApiError::BadRequest("INVALID_ID", format!("invalid id: {raw:?}")))
}

// ── Services ─────────────────────────────────────────────

pub async fn list_services(State(state): State<AppState>) -> Json<ServicesResponse> {
    Json(ServicesResponse {
        services: state
            .engine
            .list_services(false)
            .into_iter()
            .map(ServiceDto::from)
            .collect(),
    })
}

pub async fn create_service(
    State(state): State<AppState>,
    Json(body): Json<CreateServiceBody>,
) -> Result<(StatusCode, Json<ServiceDto>), ApiError> {
    let new = body
        .into_new_service()
        .ok_or(EngineError::MissingFields(vec!["name", "durationMinutes"]))?;
    let service = state.engine.create_service(new).await?;
    Ok((StatusCode::CREATED, Json(service.into())))
}

pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PatchServiceBody>,
) -> Result<Json<ServiceDto>, ApiError> {
    let id = parse_id(&id)?;
    let service = state.engine.update_service(id, body.into()).await?;
    Ok(Json(service.into()))
}

// ── Schedule ─────────────────────────────────────────────

pub async fn schedule(State(state): State<AppState>) -> Json<ScheduleResponse> {
    Json(ScheduleResponse {
        days: state.engine.schedule(),
    })
}

pub async fn set_schedule_day(
    State(state): State<AppState>,
    Path(weekday): Path<String>,
    Json(body): Json<ScheduleBody>,
) -> Result<Json<crate::model::ScheduleDayInfo>, ApiError> {
    let parsed = weekday
        .trim()
        .parse::<i64>()
        .map_err(|_| EngineError::InvalidWeekday(weekday.clone()))?;
    let day = state.engine.set_schedule_day(parsed, &body.blocks).await?;
    Ok(Json(day))
}

// ── Appointments ─────────────────────────────────────────

/// `status` defaults to `request`; `all` lists every status. An unknown
/// status matches nothing.
pub async fn list_appointments(
    State(state): State<AppState>,
    Query(q): Query<AppointmentsQuery>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let date = match q.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => Some(parse_date(raw).ok_or_else(|| EngineError::InvalidDate(raw.to_string()))?),
        None => None,
    };
    let status = q.status.as_deref().map(str::trim).unwrap_or("request");
    let filter = match status {
        "all" => None,
        other => match AppointmentStatus::parse(other) {
            Some(s) => Some(s),
            None => {
                return Ok(Json(AppointmentsResponse {
                    appointments: Vec::new(),
                }));
            }
        },
    };
    let appointments = state
        .engine
        .list_appointments(date, filter)
        .await
        .into_iter()
        .map(AppointmentDto::from)
        .collect();
    Ok(Json(AppointmentsResponse { appointments }))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id = parse_id(&id)?;
    let info = state.engine.get_appointment(id).await?;
    Ok(Json(AppointmentResponse {
        appointment: info.into(),
    }))
}

/// Apply an admin action and hand back the pre-filled WhatsApp link.
pub async fn act_on_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActionBody>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let id = parse_id(&id)?;
    let outcome = state.engine.transition(id, &body.action).await?;
    let message = render(&outcome.message, &state.studio_name);
    let wa_url = whatsapp_link(&message, &outcome.message.client_phone);
    Ok(Json(TransitionResponse {
        status: outcome.appointment.status,
        changed: outcome.changed,
        message,
        wa_url,
    }))
}
