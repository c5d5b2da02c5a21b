use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::booking::{Booking, BookingStatus, Room, Slot};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingConfirmed,
    BookingCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingConfirmed => "booking_confirmed",
            NotificationKind::BookingCancelled => "booking_cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "booking_confirmed" => Some(NotificationKind::BookingConfirmed),
            "booking_cancelled" => Some(NotificationKind::BookingCancelled),
            _ => None,
        }
    }
}

/// Everything a notification needs, frozen at the moment of the transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingNotice {
    pub booking_id: String,
    pub email: String,
    pub name: Option<String>,
    pub date: NaiveDate,
    pub slot: Slot,
    pub room: Room,
    pub price_cents: i64,
    pub access_code: String,
    #[serde(default)]
    pub refund_percent: Option<u8>,
}

impl BookingNotice {
    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id.clone(),
            email: booking.customer_email.clone(),
            name: booking.customer_name.clone(),
            date: booking.date,
            slot: booking.slot,
            room: booking.room,
            price_cents: booking.price_cents,
            access_code: booking.access_code(),
            refund_percent: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub id: i64,
    pub booking_id: String,
    pub kind: NotificationKind,
    pub notice: BookingNotice,
    pub attempts: i64,
}

/// Pushed to live availability subscribers whenever a slot is taken or freed.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityEvent {
    pub date: NaiveDate,
    pub slot: Slot,
    pub room: Room,
    pub status: BookingStatus,
}

impl AvailabilityEvent {
    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            date: booking.date,
            slot: booking.slot,
            room: booking.room,
            status: booking.status,
        }
    }
}
