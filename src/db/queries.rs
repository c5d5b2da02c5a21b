use anyhow::{anyhow, Context};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingNotice, BookingStatus, NotificationKind, OccupiedSlot, OutboxEntry, Room, Slot,
};

const DATE_FMT: &str = "%Y-%m-%d";
const TS_FMT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, user_id, date, slot, room, price_cents, status, payment_ref, \
     checkout_session_id, customer_email, customer_name, notes, created_at, updated_at";

fn now_str() -> String {
    Utc::now().naive_utc().format(TS_FMT).to_string()
}

fn date_str(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, date, slot, room, price_cents, status, payment_ref,
                               checkout_session_id, customer_email, customer_name, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            booking.id,
            booking.user_id,
            date_str(booking.date),
            booking.slot.as_str(),
            booking.room.as_str(),
            booking.price_cents,
            booking.status.as_str(),
            booking.payment_ref,
            booking.checkout_session_id,
            booking.customer_email,
            booking.customer_name,
            booking.notes,
            booking.created_at.format(TS_FMT).to_string(),
            booking.updated_at.format(TS_FMT).to_string(),
        ],
    )
    .with_context(|| format!("failed to insert booking {}", booking.id))?;
    Ok(())
}

/// Confirmed (slot, room) pairs for one date. Only confirmed rows take part in
/// availability decisions.
pub fn get_confirmed_slots_for_date(
    conn: &Connection,
    date: NaiveDate,
) -> anyhow::Result<Vec<OccupiedSlot>> {
    let mut stmt =
        conn.prepare("SELECT slot, room FROM bookings WHERE date = ?1 AND status = 'confirmed'")?;

    let rows = stmt.query_map(params![date_str(date)], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut occupied = vec![];
    for row in rows {
        let (slot, room) = row?;
        let slot = Slot::parse(&slot).ok_or_else(|| anyhow!("unknown slot in store: {slot}"))?;
        let room = Room::parse(&room).ok_or_else(|| anyhow!("unknown room in store: {room}"))?;
        occupied.push(OccupiedSlot::new(slot, room));
    }
    Ok(occupied)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_booking_row(row)));

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn find_bookings_by_session(
    conn: &Connection,
    session_id: &str,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE checkout_session_id = ?1 ORDER BY date ASC, created_at ASC"
    );
    collect_bookings(conn, &sql, params![session_id])
}

pub fn get_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = ?1 AND status != 'pending_payment' ORDER BY date ASC"
    );
    collect_bookings(conn, &sql, params![user_id])
}

pub fn get_bookings_by_status(
    conn: &Connection,
    status: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    match status {
        Some(status) => {
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 ORDER BY date DESC LIMIT ?2"
            );
            collect_bookings(conn, &sql, params![status.as_str(), limit])
        }
        None => {
            let sql =
                format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY date DESC LIMIT ?1");
            collect_bookings(conn, &sql, params![limit])
        }
    }
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    payment_ref: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, payment_ref = COALESCE(?2, payment_ref), updated_at = ?3
         WHERE id = ?4",
        params![status.as_str(), payment_ref, now_str(), id],
    )?;
    Ok(count > 0)
}

pub fn set_booking_notes(conn: &Connection, id: &str, notes: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET notes = ?1, updated_at = ?2 WHERE id = ?3",
        params![notes, now_str(), id],
    )?;
    Ok(count > 0)
}

/// Releases the still-pending rows of a checkout session. Used when a cart
/// could only be partially recorded.
pub fn cancel_pending_for_session(conn: &Connection, session_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'cancelled', updated_at = ?1
         WHERE checkout_session_id = ?2 AND status = 'pending_payment'",
        params![now_str(), session_id],
    )?;
    Ok(count)
}

fn collect_bookings(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_str: String = row.get(2)?;
    let slot_str: String = row.get(3)?;
    let room_str: String = row.get(4)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(12)?;
    let updated_at_str: String = row.get(13)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FMT)
        .with_context(|| format!("invalid booking date in store: {date_str}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TS_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TS_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date,
        slot: Slot::parse(&slot_str).ok_or_else(|| anyhow!("unknown slot in store: {slot_str}"))?,
        room: Room::parse(&room_str).ok_or_else(|| anyhow!("unknown room in store: {room_str}"))?,
        price_cents: row.get(5)?,
        status: BookingStatus::parse(&status_str)
            .ok_or_else(|| anyhow!("unknown status in store: {status_str}"))?,
        payment_ref: row.get(7)?,
        checkout_session_id: row.get(8)?,
        customer_email: row.get(9)?,
        customer_name: row.get(10)?,
        notes: row.get(11)?,
        created_at,
        updated_at,
    })
}

// ── Notification outbox ──

pub fn enqueue_notification(
    conn: &Connection,
    kind: NotificationKind,
    notice: &BookingNotice,
) -> anyhow::Result<i64> {
    let payload = serde_json::to_string(notice)?;
    conn.execute(
        "INSERT INTO notification_outbox (booking_id, kind, payload, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![notice.booking_id, kind.as_str(), payload, now_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_pending_notifications(
    conn: &Connection,
    max_attempts: i64,
    limit: i64,
) -> anyhow::Result<Vec<OutboxEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, kind, payload, attempts FROM notification_outbox
         WHERE delivered_at IS NULL AND attempts < ?1
         ORDER BY id ASC LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![max_attempts, limit], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut entries = vec![];
    for row in rows {
        let (id, booking_id, kind, payload, attempts) = row?;
        let kind = NotificationKind::parse(&kind)
            .ok_or_else(|| anyhow!("unknown notification kind in outbox: {kind}"))?;
        let notice: BookingNotice = serde_json::from_str(&payload)
            .with_context(|| format!("invalid payload for outbox entry {id}"))?;
        entries.push(OutboxEntry {
            id,
            booking_id,
            kind,
            notice,
            attempts,
        });
    }
    Ok(entries)
}

pub fn mark_notification_delivered(conn: &Connection, id: i64) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE notification_outbox SET delivered_at = ?1, attempts = attempts + 1, last_error = NULL
         WHERE id = ?2",
        params![now_str(), id],
    )?;
    Ok(())
}

pub fn record_notification_failure(conn: &Connection, id: i64, error: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE notification_outbox SET attempts = attempts + 1, last_error = ?1 WHERE id = ?2",
        params![error, id],
    )?;
    Ok(())
}

pub fn count_notifications_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM notification_outbox WHERE booking_id = ?1",
        params![booking_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
