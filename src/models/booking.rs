use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Room {
    Room1,
    Room2,
    Large,
}

impl Room {
    pub const ALL: [Room; 3] = [Room::Room1, Room::Room2, Room::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            Room::Room1 => "room1",
            Room::Room2 => "room2",
            Room::Large => "large",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "room1" => Some(Room::Room1),
            "room2" => Some(Room::Room2),
            "large" => Some(Room::Large),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Room::Room1 => "Room 1 (35 m²)",
            Room::Room2 => "Room 2 (35 m²)",
            Room::Large => "Large room (70 m²)",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    Afternoon,
    Fullday,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Morning, Slot::Afternoon, Slot::Fullday];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Afternoon => "afternoon",
            Slot::Fullday => "fullday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(Slot::Morning),
            "afternoon" => Some(Slot::Afternoon),
            "fullday" => Some(Slot::Fullday),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Slot::Morning => "Morning (8:00-12:00)",
            Slot::Afternoon => "Afternoon (13:00-17:00)",
            Slot::Fullday => "Full day (8:00-17:00)",
        }
    }

    /// Opening and closing time of the slot on its day.
    pub fn hours(&self) -> (NaiveTime, NaiveTime) {
        let (start, end) = match self {
            Slot::Morning => (8, 12),
            Slot::Afternoon => (13, 17),
            Slot::Fullday => (8, 17),
        };
        (
            NaiveTime::from_hms_opt(start, 0, 0).unwrap_or(NaiveTime::MIN),
            NaiveTime::from_hms_opt(end, 0, 0).unwrap_or(NaiveTime::MIN),
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
    ConflictPaid,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::ConflictPaid => "conflict_paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_payment" => Some(BookingStatus::PendingPayment),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "conflict_paid" => Some(BookingStatus::ConflictPaid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub slot: Slot,
    pub room: Room,
    pub price_cents: i64,
    pub status: BookingStatus,
    pub payment_ref: Option<String>,
    pub checkout_session_id: Option<String>,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    /// Local midnight of the booked day.
    pub fn day_start(&self) -> NaiveDateTime {
        self.date.and_time(NaiveTime::MIN)
    }

    /// Short code printed on confirmations and used at the door.
    pub fn access_code(&self) -> String {
        self.id.chars().take(6).collect::<String>().to_uppercase()
    }
}
