use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;

use crate::models::{Room, Slot};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("cart line {line} is no longer available: {date} {} {}", slot.as_str(), room.as_str())]
    Conflict {
        line: usize,
        date: NaiveDate,
        slot: Slot,
        room: Room,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("payment provider error: {0}")]
    Payment(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,
}

impl AppError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        AppError::Store(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = match &self {
            AppError::Conflict {
                line,
                date,
                slot,
                room,
            } => serde_json::json!({
                "error": self.to_string(),
                "line": line,
                "date": date.format("%Y-%m-%d").to_string(),
                "slot": slot,
                "room": room,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}
