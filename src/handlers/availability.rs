use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::errors::AppError;
use crate::models::pricing::{price_table, PriceEntry};
use crate::models::{Room, Slot, SlotAvailability};
use crate::services::availability;
use crate::state::AppState;

use super::parse_json;

// POST /api/check-availability
#[derive(Deserialize)]
pub struct CheckAvailabilityRequest {
    pub date: NaiveDate,
    pub slot: Slot,
    pub room: Room,
}

#[derive(Serialize)]
pub struct CheckAvailabilityResponse {
    pub available: bool,
}

pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CheckAvailabilityResponse>, AppError> {
    let req: CheckAvailabilityRequest = parse_json(&body)?;

    let available = {
        let db = state.db()?;
        availability::check_slot(&db, req.date, req.slot, req.room).map_err(AppError::store)?
    };

    Ok(Json(CheckAvailabilityResponse { available }))
}

// GET /api/availability?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<SlotAvailability>,
}

pub async fn day_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DayQuery>,
) -> Result<Json<DayAvailability>, AppError> {
    let raw = query
        .date
        .ok_or_else(|| AppError::Validation("date is required".to_string()))?;
    let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {raw}")))?;

    let slots = {
        let db = state.db()?;
        availability::day_availability(&db, date).map_err(AppError::store)?
    };

    Ok(Json(DayAvailability { date, slots }))
}

// GET /api/pricing
#[derive(Serialize)]
pub struct PricingResponse {
    pub currency: String,
    pub prices: Vec<PriceEntry>,
}

pub async fn pricing(State(state): State<Arc<AppState>>) -> Json<PricingResponse> {
    Json(PricingResponse {
        currency: state.config.currency.clone(),
        prices: price_table(),
    })
}

// GET /api/availability/events (SSE)
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.availability_tx.subscribe();

    let live_stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok::<_, Infallible>(Event::default().data(data).event("availability")))
        }
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "availability subscriber lagged");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok(Event::default().comment("keepalive")));

    Sse::new(live_stream.merge(keepalive_stream))
}
