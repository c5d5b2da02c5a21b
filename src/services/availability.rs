use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{availability_matrix, is_available, Room, Slot, SlotAvailability};

/// Reads the confirmed bookings for `date` and evaluates one candidate.
/// Every surface (preview, checkout, webhook) goes through here or through
/// `is_available` over a fresh read.
pub fn check_slot(
    conn: &Connection,
    date: NaiveDate,
    slot: Slot,
    room: Room,
) -> anyhow::Result<bool> {
    let confirmed = queries::get_confirmed_slots_for_date(conn, date)?;
    Ok(is_available(&confirmed, slot, room))
}

pub fn day_availability(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<SlotAvailability>> {
    let confirmed = queries::get_confirmed_slots_for_date(conn, date)?;
    Ok(availability_matrix(&confirmed))
}
