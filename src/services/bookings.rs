use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{can_cancel, refund_tier, Booking, BookingStatus, Identity};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingFilter {
    #[default]
    All,
    Upcoming,
    Past,
    Cancelled,
}

impl BookingFilter {
    /// Upcoming and past split on the booked day; today counts as upcoming.
    fn matches(&self, booking: &Booking, now: NaiveDateTime) -> bool {
        match self {
            BookingFilter::All => true,
            BookingFilter::Upcoming => {
                booking.status != BookingStatus::Cancelled && booking.date >= now.date()
            }
            BookingFilter::Past => {
                booking.status != BookingStatus::Cancelled && booking.date < now.date()
            }
            BookingFilter::Cancelled => booking.status == BookingStatus::Cancelled,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingSummary {
    #[serde(flatten)]
    pub booking: Booking,
    pub access_code: String,
    pub can_cancel: bool,
    pub refund_percent: u8,
}

impl BookingSummary {
    pub fn new(booking: Booking, now: NaiveDateTime) -> Self {
        let cancellable = booking.status == BookingStatus::Confirmed && can_cancel(&booking, now);
        let refund_percent = match booking.status {
            BookingStatus::Confirmed => refund_tier(&booking, now).percent(),
            _ => 0,
        };
        Self {
            access_code: booking.access_code(),
            can_cancel: cancellable,
            refund_percent,
            booking,
        }
    }
}

pub fn list_user_bookings(
    state: &Arc<AppState>,
    identity: &Identity,
    filter: BookingFilter,
    now: NaiveDateTime,
) -> Result<Vec<BookingSummary>, AppError> {
    let bookings = {
        let db = state.db()?;
        queries::get_bookings_for_user(&db, &identity.user_id).map_err(AppError::store)?
    };

    let mut summaries: Vec<BookingSummary> = bookings
        .into_iter()
        .filter(|b| filter.matches(b, now))
        .map(|b| BookingSummary::new(b, now))
        .collect();
    if filter == BookingFilter::Past {
        summaries.reverse();
    }
    Ok(summaries)
}

/// A confirmed booking owned by `identity`, for exports.
pub fn get_owned_confirmed(
    state: &Arc<AppState>,
    identity: &Identity,
    booking_id: &str,
) -> Result<Booking, AppError> {
    let db = state.db()?;
    queries::get_booking_by_id(&db, booking_id)
        .map_err(AppError::store)?
        .filter(|b| b.user_id == identity.user_id && b.status == BookingStatus::Confirmed)
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}
