use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::models::{
    is_available, price_cents, AvailabilityEvent, Booking, BookingNotice, BookingStatus,
    NotificationKind, Room, Slot,
};
use crate::services::payments::webhook::CompletedSession;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Confirmed,
    ConflictPaid,
    AlreadyProcessed,
    NotFound,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub session_id: String,
    pub outcomes: Vec<RowOutcome>,
}

impl ReconcileReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.iter().filter(|o| o.outcome == outcome).count()
    }
}

/// Single-slot purchase described entirely by session metadata, from before
/// carts were recorded as pending rows.
#[derive(Debug, PartialEq)]
struct LegacyPurchase {
    user_id: String,
    slot: Slot,
    room: Room,
    dates: Vec<NaiveDate>,
    name: Option<String>,
}

impl LegacyPurchase {
    fn from_session(session: &CompletedSession) -> Option<Self> {
        let meta = &session.metadata;
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| meta.get(*k))
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
        };

        let user_id = get(&["user_id", "userId"])?.to_string();
        let slot = Slot::parse(get(&["slot"])?)?;
        let room = Room::parse(get(&["room"])?)?;

        let raw_dates: Vec<String> = match get(&["dates"]) {
            Some(json) => serde_json::from_str(json).ok()?,
            None => vec![get(&["date"])?.to_string()],
        };
        let dates = raw_dates
            .iter()
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .collect::<Option<Vec<_>>>()?;
        if dates.is_empty() {
            return None;
        }

        let name = match (get(&["prenom"]), get(&["nom"])) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
            (None, None) => get(&["name"]).map(str::to_string),
        };

        Some(Self {
            user_id,
            slot,
            room,
            dates,
            name,
        })
    }
}

/// Turns a paid checkout session into booking outcomes. Safe to call any
/// number of times for the same session: rows that already carry a payment
/// are reported as `AlreadyProcessed` and left alone.
pub fn reconcile_completed_session(
    state: &Arc<AppState>,
    session: &CompletedSession,
) -> ReconcileReport {
    let payment_ref = session.payment_reference().to_string();
    let mut report = ReconcileReport {
        session_id: session.id.clone(),
        outcomes: vec![],
    };

    let rows = match load_session_rows(state, &session.id) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(session_id = %session.id, error = %e, "failed to load session bookings");
            report.outcomes.push(RowOutcome {
                booking_id: None,
                date: None,
                outcome: Outcome::Error,
            });
            return report;
        }
    };

    if !rows.is_empty() {
        for row in rows {
            let outcome = match settle_row(state, &row.id, &payment_ref) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(booking_id = %row.id, error = %e, "failed to settle booking");
                    Outcome::Error
                }
            };
            report.outcomes.push(RowOutcome {
                booking_id: Some(row.id),
                date: Some(row.date),
                outcome,
            });
        }
    } else if let Some(purchase) = LegacyPurchase::from_session(session) {
        let email = session.contact_email().unwrap_or_default().to_string();
        match record_legacy_purchase(state, session, &purchase, &email, &payment_ref) {
            Ok(outcomes) => report.outcomes.extend(outcomes),
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e, "failed to record legacy purchase");
                report.outcomes.extend(purchase.dates.iter().map(|date| RowOutcome {
                    booking_id: None,
                    date: Some(*date),
                    outcome: Outcome::Error,
                }));
            }
        }
    } else {
        tracing::warn!(session_id = %session.id, "no bookings or usable metadata for paid session");
        report.outcomes.push(RowOutcome {
            booking_id: None,
            date: None,
            outcome: Outcome::NotFound,
        });
    }

    if report.count(Outcome::Confirmed) > 0 {
        state.outbox_notify.notify_one();
    }

    tracing::info!(
        session_id = %report.session_id,
        confirmed = report.count(Outcome::Confirmed),
        conflict_paid = report.count(Outcome::ConflictPaid),
        already_processed = report.count(Outcome::AlreadyProcessed),
        errors = report.count(Outcome::Error),
        "checkout session reconciled"
    );
    report
}

fn load_session_rows(state: &Arc<AppState>, session_id: &str) -> anyhow::Result<Vec<Booking>> {
    let db = state.db()?;
    queries::find_bookings_by_session(&db, session_id)
}

/// Settles one row of a paid session. The availability read and the status
/// write share one lock acquisition and one transaction.
///
/// A pending row is re-evaluated. A row cancelled before any payment reached
/// it (a released cart whose session was still paid) becomes `conflict_paid`.
/// Anything else already carries a payment and is left alone.
fn settle_row(state: &Arc<AppState>, booking_id: &str, payment_ref: &str) -> anyhow::Result<Outcome> {
    let mut db = state.db()?;
    let tx = db.transaction()?;

    let Some(booking) = queries::get_booking_by_id(&tx, booking_id)? else {
        return Ok(Outcome::NotFound);
    };

    let (outcome, event) = match booking.status {
        BookingStatus::PendingPayment => settle(&tx, booking, payment_ref)?,
        BookingStatus::Cancelled if booking.payment_ref.is_none() => {
            flag_conflict(&tx, &booking, payment_ref, "payment received for a released cart")?;
            (Outcome::ConflictPaid, None)
        }
        _ => return Ok(Outcome::AlreadyProcessed),
    };
    tx.commit()?;
    drop(db);

    if let Some(event) = event {
        state.publish_availability(event);
    }
    Ok(outcome)
}

/// Records every date of a legacy purchase in one transaction, so a failure
/// leaves nothing behind and the redelivered event starts from scratch.
fn record_legacy_purchase(
    state: &Arc<AppState>,
    session: &CompletedSession,
    purchase: &LegacyPurchase,
    email: &str,
    payment_ref: &str,
) -> anyhow::Result<Vec<RowOutcome>> {
    let now = Utc::now().naive_utc();
    let mut outcomes = Vec::with_capacity(purchase.dates.len());
    let mut events = vec![];

    let mut db = state.db()?;
    let tx = db.transaction()?;
    for date in &purchase.dates {
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: purchase.user_id.clone(),
            date: *date,
            slot: purchase.slot,
            room: purchase.room,
            price_cents: price_cents(purchase.room, purchase.slot),
            status: BookingStatus::PendingPayment,
            payment_ref: None,
            checkout_session_id: Some(session.id.clone()),
            customer_email: email.to_string(),
            customer_name: purchase.name.clone(),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let id = booking.id.clone();

        queries::insert_booking(&tx, &booking)?;
        let (outcome, event) = settle(&tx, booking, payment_ref)?;
        events.extend(event);
        outcomes.push(RowOutcome {
            booking_id: Some(id),
            date: Some(*date),
            outcome,
        });
    }
    tx.commit()?;
    drop(db);

    for event in events {
        state.publish_availability(event);
    }
    Ok(outcomes)
}

/// Re-evaluates a pending booking against the confirmed rows of its date and
/// writes the resulting status. Runs inside the caller's transaction.
fn settle(
    conn: &Connection,
    mut booking: Booking,
    payment_ref: &str,
) -> anyhow::Result<(Outcome, Option<AvailabilityEvent>)> {
    let confirmed = queries::get_confirmed_slots_for_date(conn, booking.date)?;

    if is_available(&confirmed, booking.slot, booking.room) {
        queries::update_booking_status(conn, &booking.id, BookingStatus::Confirmed, Some(payment_ref))?;
        booking.status = BookingStatus::Confirmed;
        queries::enqueue_notification(
            conn,
            NotificationKind::BookingConfirmed,
            &BookingNotice::from_booking(&booking),
        )?;
        tracing::info!(
            booking_id = %booking.id,
            date = %booking.date,
            slot = booking.slot.as_str(),
            room = booking.room.as_str(),
            "booking confirmed"
        );
        Ok((Outcome::Confirmed, Some(AvailabilityEvent::from_booking(&booking))))
    } else {
        flag_conflict(
            conn,
            &booking,
            payment_ref,
            "paid booking conflicts with a confirmed booking",
        )?;
        Ok((Outcome::ConflictPaid, None))
    }
}

fn flag_conflict(
    conn: &Connection,
    booking: &Booking,
    payment_ref: &str,
    reason: &str,
) -> anyhow::Result<()> {
    queries::update_booking_status(conn, &booking.id, BookingStatus::ConflictPaid, Some(payment_ref))?;
    tracing::error!(
        booking_id = %booking.id,
        date = %booking.date,
        slot = booking.slot.as_str(),
        room = booking.room.as_str(),
        payment_ref,
        "{reason}, operator action required"
    );
    Ok(())
}
