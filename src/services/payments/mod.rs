pub mod stripe;
pub mod webhook;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub line_items: Vec<LineItem>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: String,
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> anyhow::Result<CheckoutSession>;

    /// Closes an open session so it can no longer be paid.
    async fn expire_checkout_session(&self, session_id: &str) -> anyhow::Result<()>;
}
