use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::engine::EngineError;

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    BadRequest(&'static str, String),
    Unauthorized,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
}

pub fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::MissingFields(_)
        | EngineError::InvalidTime(_)
        | EngineError::InvalidDate(_)
        | EngineError::InvalidSlot(_)
        | EngineError::InvalidAction(_)
        | EngineError::InvalidWeekday(_) => StatusCode::BAD_REQUEST,
        EngineError::BookingClosed(_) => StatusCode::FORBIDDEN,
        EngineError::ServiceNotFound(_) | EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::TimeUnavailable(_)
        | EngineError::InvalidTransition { .. }
        | EngineError::OutsideSchedule(_)
        | EngineError::AlreadyExists(_) => StatusCode::CONFLICT,
        EngineError::LimitExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::WalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Engine(EngineError::WalError(e)) => {
                tracing::error!(error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal error".to_string(),
                )
            }
            ApiError::Engine(err) => (status_for(err), err.code(), err.to_string()),
            ApiError::BadRequest(code, msg) => (StatusCode::BAD_REQUEST, *code, msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "admin session required".to_string(),
            ),
        };
        if status.is_client_error() {
            tracing::debug!(status = status.as_u16(), code, "request refused: {message}");
        }
        (
            status,
            Json(ErrorBody {
                error: &message,
                code,
            }),
        )
            .into_response()
    }
}
