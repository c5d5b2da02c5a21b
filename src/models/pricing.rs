use serde::Serialize;

use super::booking::{Room, Slot};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotShape {
    HalfDay,
    FullDay,
}

impl From<Slot> for SlotShape {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Morning | Slot::Afternoon => SlotShape::HalfDay,
            Slot::Fullday => SlotShape::FullDay,
        }
    }
}

/// Price in cents. Client-submitted amounts are never consulted.
pub fn price_cents(room: Room, slot: Slot) -> i64 {
    match (room, SlotShape::from(slot)) {
        (Room::Room1 | Room::Room2, SlotShape::HalfDay) => 5_000,
        (Room::Room1 | Room::Room2, SlotShape::FullDay) => 9_000,
        (Room::Large, SlotShape::HalfDay) => 8_000,
        (Room::Large, SlotShape::FullDay) => 14_000,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceEntry {
    pub room: Room,
    pub shape: SlotShape,
    pub price_cents: i64,
}

pub fn price_table() -> Vec<PriceEntry> {
    Room::ALL
        .iter()
        .flat_map(|&room| {
            [(Slot::Morning, SlotShape::HalfDay), (Slot::Fullday, SlotShape::FullDay)]
                .into_iter()
                .map(move |(slot, shape)| PriceEntry {
                    room,
                    shape,
                    price_cents: price_cents(room, slot),
                })
        })
        .collect()
}

pub fn format_euros(cents: i64) -> String {
    if cents % 100 == 0 {
        format!("{}€", cents / 100)
    } else {
        format!("{}.{:02}€", cents / 100, cents % 100)
    }
}
