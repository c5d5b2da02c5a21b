use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::booking::{Booking, BookingStatus};

pub const CANCELLATION_NOTICE_DAYS: i64 = 7;
const PARTIAL_REFUND_HOURS: i64 = 48;

/// Time left before the booked day starts (local midnight).
fn time_until(booking: &Booking, now: NaiveDateTime) -> Duration {
    booking.day_start() - now
}

/// A booking may be cancelled only while more than seven full days remain
/// before its date.
pub fn can_cancel(booking: &Booking, now: NaiveDateTime) -> bool {
    if booking.status == BookingStatus::Cancelled {
        return false;
    }
    time_until(booking, now) > Duration::days(CANCELLATION_NOTICE_DAYS)
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundTier {
    Full,
    Half,
    None,
}

impl RefundTier {
    pub fn percent(&self) -> u8 {
        match self {
            RefundTier::Full => 100,
            RefundTier::Half => 50,
            RefundTier::None => 0,
        }
    }

    pub fn refund_cents(&self, price_cents: i64) -> i64 {
        price_cents * i64::from(self.percent()) / 100
    }
}

/// Published refund schedule: more than 7 days ahead refunds everything,
/// 7 days down to 48 hours refunds half, later than that refunds nothing.
pub fn refund_tier(booking: &Booking, now: NaiveDateTime) -> RefundTier {
    let left = time_until(booking, now);
    if left > Duration::days(CANCELLATION_NOTICE_DAYS) {
        RefundTier::Full
    } else if left >= Duration::hours(PARTIAL_REFUND_HOURS) {
        RefundTier::Half
    } else {
        RefundTier::None
    }
}
