//! HTTP surface: the public booking endpoints and the session-gated admin API.

pub mod admin;
pub mod dto;
pub mod error;
pub mod events;
pub mod middleware;
pub mod public;

use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub sessions: Arc<SessionStore>,
    /// Signature used in outgoing WhatsApp messages.
    pub studio_name: Arc<str>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, sessions: Arc<SessionStore>, studio_name: &str) -> Self {
        Self {
            engine,
            sessions,
            studio_name: Arc::from(studio_name),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/healthz", get(public::healthz))
        .route("/api/services", get(public::list_services))
        .route("/api/availability", get(public::availability))
        .route("/api/appointments/request", post(public::request_appointment))
        .route("/api/auth/login", post(public::login))
        .route("/api/auth/logout", post(public::logout));

    let admin = Router::new()
        .route(
            "/api/admin/services",
            get(admin::list_services).post(admin::create_service),
        )
        .route("/api/admin/services/{id}", patch(admin::update_service))
        .route("/api/admin/schedule", get(admin::schedule))
        .route("/api/admin/schedule/{weekday}", put(admin::set_schedule_day))
        .route("/api/admin/appointments", get(admin::list_appointments))
        .route(
            "/api/admin/appointments/{id}",
            get(admin::get_appointment).patch(admin::act_on_appointment),
        )
        .route("/api/admin/events", get(events::stream))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_admin));

    public
        .merge(admin)
        .route_layer(from_fn(middleware::track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
