pub mod console;
pub mod resend;

use async_trait::async_trait;

use crate::models::pricing::format_euros;
use crate::models::BookingNotice;

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn send_booking_confirmed(&self, notice: &BookingNotice) -> anyhow::Result<()>;
    async fn send_booking_cancelled(&self, notice: &BookingNotice) -> anyhow::Result<()>;
}

pub struct RenderedMessage {
    pub subject: String,
    pub text: String,
}

fn greeting(notice: &BookingNotice) -> String {
    match notice.name.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(name) => format!("Hello {name},"),
        None => "Hello,".to_string(),
    }
}

pub fn render_confirmation(notice: &BookingNotice) -> RenderedMessage {
    let date = notice.date.format("%A %-d %B %Y");
    let text = format!(
        "{}\n\n\
         Your booking is confirmed.\n\n\
         Date: {date}\n\
         Slot: {}\n\
         Room: {}\n\
         Price: {}\n\n\
         Access code: {}\n\
         The code is only active on {date}.\n",
        greeting(notice),
        notice.slot.label(),
        notice.room.label(),
        format_euros(notice.price_cents),
        notice.access_code,
    );
    RenderedMessage {
        subject: "Your booking is confirmed".to_string(),
        text,
    }
}

pub fn render_cancellation(notice: &BookingNotice) -> RenderedMessage {
    let date = notice.date.format("%A %-d %B %Y");
    let refund = match notice.refund_percent {
        Some(percent) => format!("Refund due under the cancellation terms: {percent}%\n"),
        None => String::new(),
    };
    let text = format!(
        "{}\n\n\
         Your booking has been cancelled.\n\n\
         Date: {date}\n\
         Slot: {}\n\
         Room: {}\n\
         {refund}",
        greeting(notice),
        notice.slot.label(),
        notice.room.label(),
    );
    RenderedMessage {
        subject: "Your booking has been cancelled".to_string(),
        text,
    }
}
