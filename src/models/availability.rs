use serde::{Deserialize, Serialize};

use super::booking::{Room, Slot};

/// A confirmed (slot, room) pair on some date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OccupiedSlot {
    pub slot: Slot,
    pub room: Room,
}

impl OccupiedSlot {
    pub fn new(slot: Slot, room: Room) -> Self {
        Self { slot, room }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotAvailability {
    pub slot: Slot,
    pub room: Room,
    pub available: bool,
}

/// Decides whether `(slot, room)` can still be booked on a date, given the
/// confirmed bookings for that same date.
///
/// The rules are deliberately asymmetric: a full-day request on a small room is
/// blocked by any booking of the large room, whatever its shape, while a
/// full-day request on the large room is blocked by any booking at all.
pub fn is_available(confirmed: &[OccupiedSlot], slot: Slot, room: Room) -> bool {
    if slot == Slot::Fullday {
        if room == Room::Large {
            return confirmed.is_empty();
        }
        let room_booked = confirmed.iter().any(|b| b.room == room);
        let large_booked = confirmed.iter().any(|b| b.room == Room::Large);
        return !room_booked && !large_booked;
    }

    let fullday_on_room = confirmed
        .iter()
        .any(|b| b.slot == Slot::Fullday && b.room == room);
    if fullday_on_room {
        return false;
    }

    let fullday_on_large = confirmed
        .iter()
        .any(|b| b.slot == Slot::Fullday && b.room == Room::Large);
    if fullday_on_large {
        return false;
    }

    let mut same_slot = confirmed.iter().filter(|b| b.slot == slot);
    if room == Room::Large {
        same_slot.next().is_none()
    } else {
        !same_slot.any(|b| b.room == room || b.room == Room::Large)
    }
}

/// Every slot/room combination for one date, in display order.
pub fn availability_matrix(confirmed: &[OccupiedSlot]) -> Vec<SlotAvailability> {
    Slot::ALL
        .iter()
        .flat_map(|&slot| {
            Room::ALL.iter().map(move |&room| SlotAvailability {
                slot,
                room,
                available: is_available(confirmed, slot, room),
            })
        })
        .collect()
}
