use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use super::dto::*;
use super::error::ApiError;
use super::middleware::wants_secure_cookie;
use super::AppState;
use crate::session::{clear_session_cookie, session_cookie, session_token};

pub async fn healthz() -> &'static str {
    "ok"
}

/// Active services, sorted by name.
pub async fn list_services(State(state): State<AppState>) -> Json<Vec<PublicServiceDto>> {
    Json(
        state
            .engine
            .list_services(true)
            .into_iter()
            .map(PublicServiceDto::from)
            .collect(),
    )
}

pub async fn availability(
    State(state): State<AppState>,
    Query(q): Query<AvailabilityQuery>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let slots = state
        .engine
        .compute_availability(&q.date, &q.service_id)
        .await?;
    Ok(Json(SlotsResponse { slots }))
}

pub async fn request_appointment(
    State(state): State<AppState>,
    Json(body): Json<BookingBody>,
) -> Result<Json<BookingResponse>, ApiError> {
    let appointment = state.engine.request_booking(body.into()).await?;
    Ok(Json(BookingResponse {
        ok: true,
        appointment_id: appointment.id,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<(CookieJar, Json<OkResponse>), ApiError> {
    let token = state
        .sessions
        .login(&body.username, &body.password)
        .ok_or(ApiError::Unauthorized)?;
    let cookie = session_cookie(
        token,
        state.sessions.ttl(),
        wants_secure_cookie(&state, &headers),
    );
    Ok((jar.add(cookie), Json(OkResponse { ok: true })))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, Json<OkResponse>) {
    if let Some(token) = session_token(&jar) {
        state.sessions.logout(&token);
    }
    let cleared = clear_session_cookie(wants_secure_cookie(&state, &headers));
    (jar.add(cleared), Json(OkResponse { ok: true }))
}
