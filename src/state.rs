use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tokio::sync::{broadcast, Notify};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::AvailabilityEvent;
use crate::services::auth::AdminPolicy;
use crate::services::notifications::NotificationProvider;
use crate::services::payments::PaymentProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub payments: Box<dyn PaymentProvider>,
    pub notifier: Box<dyn NotificationProvider>,
    pub admin_policy: Box<dyn AdminPolicy>,
    /// Wakes the outbox dispatcher after a commit that enqueued notifications.
    pub outbox_notify: Notify,
    pub availability_tx: broadcast::Sender<AvailabilityEvent>,
}

impl AppState {
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Store("database lock poisoned".to_string()))
    }

    pub fn publish_availability(&self, event: AvailabilityEvent) {
        // no subscribers is fine
        let _ = self.availability_tx.send(event);
    }
}
