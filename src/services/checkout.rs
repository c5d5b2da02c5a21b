use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::cart::{compact_dates, MAX_CART_LINES};
use crate::models::{
    is_available, price_cents, Booking, BookingStatus, CartLine, CheckoutRequest,
    CheckoutResponse, Identity, OccupiedSlot,
};
use crate::services::payments::{CheckoutSessionParams, LineItem};
use crate::state::AppState;

/// Validates a cart, opens a payment session for it and records one
/// `pending_payment` row per line.
///
/// Nothing is written unless every line is available. Rows are inserted one by
/// one after the session exists; if any insert fails, the session is expired
/// and the rows already written for it are cancelled.
pub async fn create_checkout(
    state: &Arc<AppState>,
    identity: &Identity,
    request: CheckoutRequest,
    today: NaiveDate,
) -> Result<CheckoutResponse, AppError> {
    let lines = request.lines;
    if lines.is_empty() {
        return Err(AppError::Validation("cart is empty".to_string()));
    }
    if lines.len() > MAX_CART_LINES {
        return Err(AppError::Validation(format!(
            "cart has {} lines, at most {MAX_CART_LINES} allowed",
            lines.len()
        )));
    }
    if let Some((index, line)) = lines.iter().enumerate().find(|(_, l)| l.date < today) {
        return Err(AppError::Validation(format!(
            "cart line {} is in the past: {}",
            index + 1,
            line.date
        )));
    }

    {
        let db = state.db()?;
        validate_cart(&db, &lines)?;
    }

    let customer_email = request
        .email
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| identity.email.clone());
    let customer_name = request
        .name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| identity.name.clone());

    let line_items: Vec<LineItem> = lines
        .iter()
        .map(|line| LineItem {
            name: format!("{} - {}", line.room.label(), line.slot.label()),
            description: line.date.format("%A %-d %B %Y").to_string(),
            amount_cents: price_cents(line.room, line.slot),
        })
        .collect();
    let total_cents: i64 = line_items.iter().map(|item| item.amount_cents).sum();

    let params = CheckoutSessionParams {
        line_items,
        currency: state.config.currency.clone(),
        success_url: state.config.success_url(),
        cancel_url: state.config.cancel_url(),
        customer_email: customer_email.clone(),
        metadata: vec![
            ("user_id".to_string(), identity.user_id.clone()),
            ("kind".to_string(), "cart".to_string()),
            ("dates".to_string(), compact_dates(&lines)),
        ],
    };

    let session = state
        .payments
        .create_checkout_session(&params)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    let now = Utc::now().naive_utc();
    let bookings: Vec<Booking> = lines
        .iter()
        .map(|line| Booking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: identity.user_id.clone(),
            date: line.date,
            slot: line.slot,
            room: line.room,
            price_cents: price_cents(line.room, line.slot),
            status: BookingStatus::PendingPayment,
            payment_ref: None,
            checkout_session_id: Some(session.id.clone()),
            customer_email: customer_email.clone(),
            customer_name: customer_name.clone(),
            notes: None,
            created_at: now,
            updated_at: now,
        })
        .collect();

    let inserted = {
        let db = state.db()?;
        insert_pending(&db, &bookings)
    };

    if let Err(e) = inserted {
        tracing::error!(
            session_id = %session.id,
            error = %e,
            "failed to record cart, releasing checkout session"
        );
        compensate(state, &session.id).await;
        return Err(AppError::store(e));
    }

    tracing::info!(
        session_id = %session.id,
        user_id = %identity.user_id,
        lines = bookings.len(),
        total_cents,
        "checkout session created"
    );

    Ok(CheckoutResponse {
        session_id: session.id,
        url: session.url,
        total_cents,
        booking_ids: bookings.into_iter().map(|b| b.id).collect(),
    })
}

/// Checks every line against the confirmed bookings of its date plus the
/// cart's earlier lines on that date. The first unavailable line aborts.
fn validate_cart(conn: &Connection, lines: &[CartLine]) -> Result<(), AppError> {
    let mut occupied: HashMap<NaiveDate, Vec<OccupiedSlot>> = HashMap::new();

    for (index, line) in lines.iter().enumerate() {
        if !occupied.contains_key(&line.date) {
            let confirmed =
                queries::get_confirmed_slots_for_date(conn, line.date).map_err(AppError::store)?;
            occupied.insert(line.date, confirmed);
        }
        let taken = occupied.entry(line.date).or_default();

        if !is_available(taken, line.slot, line.room) {
            tracing::info!(
                line = index + 1,
                date = %line.date,
                slot = line.slot.as_str(),
                room = line.room.as_str(),
                "cart line unavailable"
            );
            return Err(AppError::Conflict {
                line: index + 1,
                date: line.date,
                slot: line.slot,
                room: line.room,
            });
        }
        taken.push(OccupiedSlot::new(line.slot, line.room));
    }
    Ok(())
}

fn insert_pending(conn: &Connection, bookings: &[Booking]) -> anyhow::Result<()> {
    for booking in bookings {
        queries::insert_booking(conn, booking)?;
    }
    Ok(())
}

/// Best-effort release of a session whose rows could not all be written.
async fn compensate(state: &Arc<AppState>, session_id: &str) {
    let released = state
        .db()
        .map_err(anyhow::Error::from)
        .and_then(|db| queries::cancel_pending_for_session(&db, session_id));
    match released {
        Ok(count) => tracing::warn!(session_id, count, "cancelled partially recorded cart"),
        Err(e) => tracing::error!(session_id, error = %e, "failed to cancel partial cart"),
    }

    if let Err(e) = state.payments.expire_checkout_session(session_id).await {
        tracing::error!(session_id, error = %e, "failed to expire checkout session");
    }
}
