use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    can_cancel, refund_tier, AvailabilityEvent, Booking, BookingNotice, BookingStatus, Identity,
    NotificationKind,
};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CancellationReceipt {
    pub booking_id: String,
    pub status: BookingStatus,
    pub refund_percent: u8,
    pub refund_cents: i64,
}

/// Cancels a confirmed booking on behalf of its owner.
///
/// The status change and the `BookingCancelled` outbox row are written in one
/// transaction; the email goes out later through the dispatcher.
pub fn cancel_booking(
    state: &Arc<AppState>,
    identity: &Identity,
    booking_id: &str,
    now: NaiveDateTime,
) -> Result<CancellationReceipt, AppError> {
    let (booking, tier) = {
        let mut db = state.db()?;
        let tx = db.transaction()?;

        let booking = queries::get_booking_by_id(&tx, booking_id)
            .map_err(AppError::store)?
            .filter(|b| b.user_id == identity.user_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

        if booking.status != BookingStatus::Confirmed {
            return Err(AppError::InvalidState(format!(
                "booking is {}, only confirmed bookings can be cancelled",
                booking.status.as_str()
            )));
        }
        if !can_cancel(&booking, now) {
            return Err(AppError::InvalidState(
                "cancellation window closed: bookings can be cancelled up to 7 days before".to_string(),
            ));
        }

        let tier = refund_tier(&booking, now);
        queries::update_booking_status(&tx, &booking.id, BookingStatus::Cancelled, None)
            .map_err(AppError::store)?;

        let mut notice = BookingNotice::from_booking(&booking);
        notice.refund_percent = Some(tier.percent());
        queries::enqueue_notification(&tx, NotificationKind::BookingCancelled, &notice)
            .map_err(AppError::store)?;

        tx.commit()?;
        (booking, tier)
    };

    let cancelled = Booking {
        status: BookingStatus::Cancelled,
        ..booking
    };
    state.outbox_notify.notify_one();
    state.publish_availability(AvailabilityEvent::from_booking(&cancelled));

    tracing::info!(
        booking_id = %cancelled.id,
        user_id = %identity.user_id,
        refund_percent = tier.percent(),
        "booking cancelled"
    );

    Ok(CancellationReceipt {
        booking_id: cancelled.id,
        status: BookingStatus::Cancelled,
        refund_percent: tier.percent(),
        refund_cents: tier.refund_cents(cancelled.price_cents),
    })
}

/// Operator remediation for a paid booking that lost its slot: moves
/// `conflict_paid` to `cancelled` and records the operator's note. No other
/// transition goes through here.
pub fn resolve_conflict(
    state: &Arc<AppState>,
    booking_id: &str,
    note: &str,
) -> Result<Booking, AppError> {
    let note = note.trim();
    if note.is_empty() {
        return Err(AppError::Validation("a resolution note is required".to_string()));
    }

    let mut db = state.db()?;
    let tx = db.transaction()?;

    let booking = queries::get_booking_by_id(&tx, booking_id)
        .map_err(AppError::store)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    if booking.status != BookingStatus::ConflictPaid {
        return Err(AppError::InvalidState(format!(
            "booking is {}, only conflict_paid bookings can be resolved",
            booking.status.as_str()
        )));
    }

    queries::update_booking_status(&tx, booking_id, BookingStatus::Cancelled, None)
        .map_err(AppError::store)?;
    queries::set_booking_notes(&tx, booking_id, note).map_err(AppError::store)?;
    let resolved = queries::get_booking_by_id(&tx, booking_id)
        .map_err(AppError::store)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    tx.commit()?;

    tracing::info!(booking_id, payment_ref = ?resolved.payment_ref, "paid conflict resolved");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Room, Slot};
    use crate::services::testing::{harness, identity, seed_booking};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_cancel_confirmed_booking_with_notice() {
        let h = harness();
        seed_booking(&h.state, "b1", "2025-06-20", Slot::Morning, Room::Room1, BookingStatus::Confirmed, None);
        let mut rx = h.state.availability_tx.subscribe();

        let receipt = cancel_booking(&h.state, &identity(), "b1", at(2025, 6, 1, 9)).unwrap();
        assert_eq!(receipt.refund_percent, 100);
        assert_eq!(receipt.refund_cents, 5_000);

        let db = h.state.db.lock().unwrap();
        assert_eq!(
            queries::get_booking_by_id(&db, "b1").unwrap().unwrap().status,
            BookingStatus::Cancelled
        );
        let pending = queries::get_pending_notifications(&db, 5, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, NotificationKind::BookingCancelled);
        assert_eq!(pending[0].notice.refund_percent, Some(100));
        drop(db);

        assert_eq!(rx.try_recv().unwrap().status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_cancel_inside_window_refused() {
        let h = harness();
        seed_booking(&h.state, "b1", "2025-06-08", Slot::Morning, Room::Room1, BookingStatus::Confirmed, None);

        // exactly 7 days before local midnight
        let err = cancel_booking(&h.state, &identity(), "b1", at(2025, 6, 1, 0)).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let db = h.state.db.lock().unwrap();
        assert_eq!(
            queries::get_booking_by_id(&db, "b1").unwrap().unwrap().status,
            BookingStatus::Confirmed
        );
        assert_eq!(queries::count_notifications_for_booking(&db, "b1").unwrap(), 0);
    }

    #[test]
    fn test_cancel_requires_ownership() {
        let h = harness();
        seed_booking(&h.state, "b1", "2025-06-20", Slot::Morning, Room::Room1, BookingStatus::Confirmed, None);
        let stranger = Identity {
            user_id: "user-2".to_string(),
            email: "other@example.com".to_string(),
            name: None,
        };
        let err = cancel_booking(&h.state, &stranger, "b1", at(2025, 6, 1, 9)).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = cancel_booking(&h.state, &identity(), "nope", at(2025, 6, 1, 9)).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_cancel_rejects_non_confirmed_states() {
        let h = harness();
        seed_booking(&h.state, "p", "2025-06-20", Slot::Morning, Room::Room1, BookingStatus::PendingPayment, None);
        seed_booking(&h.state, "c", "2025-06-20", Slot::Morning, Room::Room2, BookingStatus::Cancelled, None);
        for id in ["p", "c"] {
            let err = cancel_booking(&h.state, &identity(), id, at(2025, 6, 1, 9)).unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)));
        }
    }

    #[test]
    fn test_resolve_conflict_paid() {
        let h = harness();
        seed_booking(&h.state, "k", "2025-06-20", Slot::Morning, Room::Room1, BookingStatus::ConflictPaid, None);

        let resolved = resolve_conflict(&h.state, "k", "refunded by hand").unwrap();
        assert_eq!(resolved.status, BookingStatus::Cancelled);
        assert_eq!(resolved.notes.as_deref(), Some("refunded by hand"));

        let err = resolve_conflict(&h.state, "k", "again").unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn test_resolve_only_touches_conflicts() {
        let h = harness();
        seed_booking(&h.state, "c", "2025-06-20", Slot::Morning, Room::Room1, BookingStatus::Confirmed, None);
        assert!(matches!(
            resolve_conflict(&h.state, "c", "note").unwrap_err(),
            AppError::InvalidState(_)
        ));
        assert!(matches!(
            resolve_conflict(&h.state, "c", "  ").unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            resolve_conflict(&h.state, "missing", "note").unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
