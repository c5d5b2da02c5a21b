use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{broadcast, Notify};

use crate::config::AppConfig;
use crate::db::{self, queries};
use crate::models::{Booking, BookingNotice, BookingStatus, Identity, NotificationKind, Room, Slot};
use crate::services::auth::EmailAllowlist;
use crate::services::notifications::NotificationProvider;
use crate::services::payments::{CheckoutSession, CheckoutSessionParams, PaymentProvider};
use crate::state::AppState;

pub struct MockPayments {
    pub created: Arc<Mutex<Vec<CheckoutSessionParams>>>,
    pub expired: Arc<Mutex<Vec<String>>>,
    pub fail: Arc<AtomicBool>,
    counter: AtomicUsize,
}

#[async_trait]
impl PaymentProvider for MockPayments {
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> anyhow::Result<CheckoutSession> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("provider unavailable");
        }
        self.created.lock().unwrap().push(params.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CheckoutSession {
            id: format!("cs_test_{n}"),
            url: format!("https://checkout.test/cs_test_{n}"),
        })
    }

    async fn expire_checkout_session(&self, session_id: &str) -> anyhow::Result<()> {
        self.expired.lock().unwrap().push(session_id.to_string());
        Ok(())
    }
}

pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(NotificationKind, BookingNotice)>>>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    fn record(&self, kind: NotificationKind, notice: &BookingNotice) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("mailer down");
        }
        self.sent.lock().unwrap().push((kind, notice.clone()));
        Ok(())
    }
}

#[async_trait]
impl NotificationProvider for RecordingNotifier {
    async fn send_booking_confirmed(&self, notice: &BookingNotice) -> anyhow::Result<()> {
        self.record(NotificationKind::BookingConfirmed, notice)
    }

    async fn send_booking_cancelled(&self, notice: &BookingNotice) -> anyhow::Result<()> {
        self.record(NotificationKind::BookingCancelled, notice)
    }
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub created: Arc<Mutex<Vec<CheckoutSessionParams>>>,
    pub expired: Arc<Mutex<Vec<String>>>,
    pub payments_fail: Arc<AtomicBool>,
    pub sent: Arc<Mutex<Vec<(NotificationKind, BookingNotice)>>>,
    pub notifier_fail: Arc<AtomicBool>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        site_url: "http://localhost:3000".to_string(),
        currency: "eur".to_string(),
        stripe_secret_key: "sk_test".to_string(),
        stripe_webhook_secret: "whsec_test".to_string(),
        stripe_webhook_tolerance_secs: 300,
        resend_api_key: String::new(),
        email_from: "bookings@example.com".to_string(),
        admin_emails: vec!["admin@example.com".to_string()],
        outbox_interval_secs: 30,
    }
}

pub fn harness() -> Harness {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();
    let created = Arc::new(Mutex::new(vec![]));
    let expired = Arc::new(Mutex::new(vec![]));
    let payments_fail = Arc::new(AtomicBool::new(false));
    let sent = Arc::new(Mutex::new(vec![]));
    let notifier_fail = Arc::new(AtomicBool::new(false));
    let (availability_tx, _) = broadcast::channel(16);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        admin_policy: Box::new(EmailAllowlist::new(config.admin_emails.clone())),
        config,
        payments: Box::new(MockPayments {
            created: Arc::clone(&created),
            expired: Arc::clone(&expired),
            fail: Arc::clone(&payments_fail),
            counter: AtomicUsize::new(0),
        }),
        notifier: Box::new(RecordingNotifier {
            sent: Arc::clone(&sent),
            fail: Arc::clone(&notifier_fail),
        }),
        outbox_notify: Notify::new(),
        availability_tx,
    });

    Harness {
        state,
        created,
        expired,
        payments_fail,
        sent,
        notifier_fail,
    }
}

pub fn identity() -> Identity {
    Identity {
        user_id: "user-1".to_string(),
        email: "pro@example.com".to_string(),
        name: Some("Camille Martin".to_string()),
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn seed_booking(
    state: &AppState,
    id: &str,
    date_str: &str,
    slot: Slot,
    room: Room,
    status: BookingStatus,
    session_id: Option<&str>,
) -> Booking {
    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        date: date(date_str),
        slot,
        room,
        price_cents: crate::models::price_cents(room, slot),
        status,
        payment_ref: None,
        checkout_session_id: session_id.map(str::to_string),
        customer_email: "pro@example.com".to_string(),
        customer_name: Some("Camille Martin".to_string()),
        notes: None,
        created_at: now,
        updated_at: now,
    };
    let db = state.db.lock().unwrap();
    queries::insert_booking(&db, &booking).unwrap();
    booking
}
