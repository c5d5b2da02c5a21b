use std::sync::Arc;
use std::time::Duration;

use crate::db::queries;
use crate::models::{NotificationKind, OutboxEntry};
use crate::state::AppState;

/// Entries that failed this many times stay in the table for inspection but
/// are no longer retried.
pub const MAX_ATTEMPTS: i64 = 5;
const BATCH_SIZE: i64 = 50;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
}

async fn deliver(state: &AppState, entry: &OutboxEntry) -> anyhow::Result<()> {
    match entry.kind {
        NotificationKind::BookingConfirmed => {
            state.notifier.send_booking_confirmed(&entry.notice).await
        }
        NotificationKind::BookingCancelled => {
            state.notifier.send_booking_cancelled(&entry.notice).await
        }
    }
}

/// Sends up to `limit` undelivered notifications. Failures are recorded on
/// the outbox row and never affect booking state.
pub async fn dispatch_pending(state: &Arc<AppState>, limit: i64) -> anyhow::Result<DispatchSummary> {
    let entries = {
        let db = state.db()?;
        queries::get_pending_notifications(&db, MAX_ATTEMPTS, limit)?
    };

    let mut summary = DispatchSummary::default();
    for entry in entries {
        let result = deliver(state, &entry).await;

        let db = state.db()?;
        match result {
            Ok(()) => {
                queries::mark_notification_delivered(&db, entry.id)?;
                summary.delivered += 1;
                tracing::info!(
                    outbox_id = entry.id,
                    booking_id = %entry.booking_id,
                    kind = entry.kind.as_str(),
                    "notification delivered"
                );
            }
            Err(e) => {
                queries::record_notification_failure(&db, entry.id, &e.to_string())?;
                summary.failed += 1;
                tracing::warn!(
                    outbox_id = entry.id,
                    booking_id = %entry.booking_id,
                    kind = entry.kind.as_str(),
                    attempt = entry.attempts + 1,
                    error = %e,
                    "notification delivery failed"
                );
            }
        }
    }
    Ok(summary)
}

/// Background loop: drains the outbox whenever a transition nudges it and on a
/// fixed interval otherwise.
pub async fn run_dispatcher(state: Arc<AppState>) {
    let period = Duration::from_secs(state.config.outbox_interval_secs.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = state.outbox_notify.notified() => {}
        }

        match dispatch_pending(&state, BATCH_SIZE).await {
            Ok(summary) if summary.delivered + summary.failed > 0 => {
                tracing::debug!(delivered = summary.delivered, failed = summary.failed, "outbox drained");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "outbox dispatch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingNotice, BookingStatus, Room, Slot};
    use crate::services::testing::{harness, seed_booking};
    use std::sync::atomic::Ordering;

    fn enqueue(state: &Arc<AppState>, id: &str, kind: NotificationKind) {
        let booking = seed_booking(state, id, "2025-06-10", Slot::Morning, Room::Room1, BookingStatus::Confirmed, None);
        let db = state.db.lock().unwrap();
        queries::enqueue_notification(&db, kind, &BookingNotice::from_booking(&booking)).unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_delivers_each_kind_once() {
        let h = harness();
        enqueue(&h.state, "b1", NotificationKind::BookingConfirmed);
        enqueue(&h.state, "b2", NotificationKind::BookingCancelled);

        let summary = dispatch_pending(&h.state, 10).await.unwrap();
        assert_eq!(summary, DispatchSummary { delivered: 2, failed: 0 });

        {
            let sent = h.sent.lock().unwrap();
            assert_eq!(sent.len(), 2);
            assert_eq!(sent[0].0, NotificationKind::BookingConfirmed);
            assert_eq!(sent[0].1.access_code, "B1");
            assert_eq!(sent[1].0, NotificationKind::BookingCancelled);
        }

        let again = dispatch_pending(&h.state, 10).await.unwrap();
        assert_eq!(again, DispatchSummary::default());
        assert_eq!(h.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_recorded_and_capped() {
        let h = harness();
        enqueue(&h.state, "b1", NotificationKind::BookingConfirmed);
        h.notifier_fail.store(true, Ordering::SeqCst);

        for _ in 0..MAX_ATTEMPTS {
            let summary = dispatch_pending(&h.state, 10).await.unwrap();
            assert_eq!(summary.failed, 1);
        }
        assert_eq!(dispatch_pending(&h.state, 10).await.unwrap(), DispatchSummary::default());

        let db = h.state.db.lock().unwrap();
        let booking = queries::get_booking_by_id(&db, "b1").unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_delivery_resumes_after_transient_failure() {
        let h = harness();
        enqueue(&h.state, "b1", NotificationKind::BookingConfirmed);
        h.notifier_fail.store(true, Ordering::SeqCst);
        assert_eq!(dispatch_pending(&h.state, 10).await.unwrap().failed, 1);

        h.notifier_fail.store(false, Ordering::SeqCst);
        assert_eq!(dispatch_pending(&h.state, 10).await.unwrap().delivered, 1);
        assert_eq!(h.sent.lock().unwrap().len(), 1);
    }
}
