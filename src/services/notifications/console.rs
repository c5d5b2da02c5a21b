use async_trait::async_trait;

use super::{render_cancellation, render_confirmation, NotificationProvider};
use crate::models::BookingNotice;

/// Writes notifications to the log instead of sending them. Used when no email
/// API key is configured.
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotificationProvider;

#[async_trait]
impl NotificationProvider for ConsoleNotificationProvider {
    async fn send_booking_confirmed(&self, notice: &BookingNotice) -> anyhow::Result<()> {
        let message = render_confirmation(notice);
        tracing::info!(
            to = %notice.email,
            booking_id = %notice.booking_id,
            subject = %message.subject,
            "confirmation email (not sent, no provider configured)\n{}",
            message.text
        );
        Ok(())
    }

    async fn send_booking_cancelled(&self, notice: &BookingNotice) -> anyhow::Result<()> {
        let message = render_cancellation(notice);
        tracing::info!(
            to = %notice.email,
            booking_id = %notice.booking_id,
            subject = %message.subject,
            "cancellation email (not sent, no provider configured)\n{}",
            message.text
        );
        Ok(())
    }
}
