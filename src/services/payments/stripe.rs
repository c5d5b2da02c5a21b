use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutSession, CheckoutSessionParams, PaymentProvider};

const STRIPE_API: &str = "https://api.stripe.com/v1";

pub struct StripeProvider {
    secret_key: String,
    client: reqwest::Client,
}

impl StripeProvider {
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

/// Stripe takes nested parameters as bracketed form keys.
pub fn session_form(params: &CheckoutSessionParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), params.success_url.clone()),
        ("cancel_url".to_string(), params.cancel_url.clone()),
        ("customer_email".to_string(), params.customer_email.clone()),
    ];

    for (i, item) in params.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[quantity]"), "1".to_string()));
        form.push((
            format!("{prefix}[price_data][currency]"),
            params.currency.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.amount_cents.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][description]"),
            item.description.clone(),
        ));
    }

    for (key, value) in &params.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    form
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> anyhow::Result<CheckoutSession> {
        anyhow::ensure!(!self.secret_key.is_empty(), "STRIPE_SECRET_KEY is not configured");

        let session: SessionResponse = self
            .client
            .post(format!("{STRIPE_API}/checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .form(&session_form(params))
            .send()
            .await
            .context("failed to reach Stripe")?
            .error_for_status()
            .context("Stripe rejected checkout session")?
            .json()
            .await
            .context("invalid Stripe checkout session response")?;

        Ok(CheckoutSession {
            url: session.url.unwrap_or_default(),
            id: session.id,
        })
    }

    async fn expire_checkout_session(&self, session_id: &str) -> anyhow::Result<()> {
        self.client
            .post(format!("{STRIPE_API}/checkout/sessions/{session_id}/expire"))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("failed to reach Stripe")?
            .error_for_status()
            .context("Stripe refused to expire checkout session")?;
        Ok(())
    }
}
