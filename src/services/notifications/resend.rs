use anyhow::Context;
use async_trait::async_trait;

use super::{render_cancellation, render_confirmation, NotificationProvider, RenderedMessage};
use crate::models::BookingNotice;

pub struct ResendEmailProvider {
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl ResendEmailProvider {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            api_key,
            from,
            client: reqwest::Client::new(),
        }
    }

    async fn send(&self, to: &str, message: RenderedMessage) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "from": self.from,
            "to": [to],
            "subject": message.subject,
            "text": message.text,
        });

        self.client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to reach Resend")?
            .error_for_status()
            .context("Resend API returned error")?;

        Ok(())
    }
}

#[async_trait]
impl NotificationProvider for ResendEmailProvider {
    async fn send_booking_confirmed(&self, notice: &BookingNotice) -> anyhow::Result<()> {
        self.send(&notice.email, render_confirmation(notice)).await
    }

    async fn send_booking_cancelled(&self, notice: &BookingNotice) -> anyhow::Result<()> {
        self.send(&notice.email, render_cancellation(notice)).await
    }
}
