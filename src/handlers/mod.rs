pub mod admin;
pub mod availability;
pub mod bookings;
pub mod checkout;
pub mod health;
pub mod webhook;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/check-availability", post(availability::check_availability))
        .route("/api/availability", get(availability::day_availability))
        .route("/api/availability/events", get(availability::events_stream))
        .route("/api/pricing", get(availability::pricing))
        .route(
            "/api/create-checkout-session",
            post(checkout::create_checkout_session),
        )
        .route("/api/webhooks/stripe", post(webhook::stripe_webhook))
        .route("/api/bookings", get(bookings::list_bookings))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/bookings/:id/calendar.ics", get(bookings::download_ics))
        .route("/api/admin/bookings", get(admin::list_bookings))
        .route(
            "/api/admin/bookings/:id/resolve",
            post(admin::resolve_booking),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Malformed request bodies are validation errors (400), including unknown
/// rooms, slots and unparseable dates.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::Validation(e.to_string()))
}
