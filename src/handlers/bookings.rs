use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::Identity;
use crate::services::bookings::{self, BookingFilter, BookingSummary};
use crate::services::calendar::generate_ics;
use crate::services::cancellation::{self, CancellationReceipt};
use crate::state::AppState;

const CALENDAR_NAME: &str = "Room booking";

// GET /api/bookings?filter=all|upcoming|past|cancelled
#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: BookingFilter,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BookingSummary>>, AppError> {
    let now = chrono::Local::now().naive_local();
    let rows = bookings::list_user_bookings(&state, &identity, query.filter, now)?;
    Ok(Json(rows))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<CancellationReceipt>, AppError> {
    let now = chrono::Local::now().naive_local();
    let receipt = cancellation::cancel_booking(&state, &identity, &id, now)?;
    Ok(Json(receipt))
}

// GET /api/bookings/:id/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let booking = bookings::get_owned_confirmed(&state, &identity, &id)?;

    let ics = generate_ics(&booking, CALENDAR_NAME);
    let filename = format!("booking-{}.ics", booking.access_code().to_lowercase());

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
