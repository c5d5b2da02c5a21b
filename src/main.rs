use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, Notify};
use tracing_subscriber::EnvFilter;

use roombook::config::AppConfig;
use roombook::db;
use roombook::handlers;
use roombook::services::auth::EmailAllowlist;
use roombook::services::notifications::console::ConsoleNotificationProvider;
use roombook::services::notifications::resend::ResendEmailProvider;
use roombook::services::notifications::NotificationProvider;
use roombook::services::outbox;
use roombook::services::payments::stripe::StripeProvider;
use roombook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    anyhow::ensure!(
        !config.stripe_secret_key.is_empty(),
        "STRIPE_SECRET_KEY must be set"
    );
    if config.stripe_webhook_secret.is_empty() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET is not set, webhooks will be rejected");
    }
    if config.admin_emails.is_empty() {
        tracing::warn!("ADMIN_EMAILS is empty, admin routes are unreachable");
    }

    let conn = db::init_db(&config.database_url)?;

    let notifier: Box<dyn NotificationProvider> = if config.resend_api_key.is_empty() {
        tracing::info!("no RESEND_API_KEY, notifications will be logged only");
        Box::new(ConsoleNotificationProvider)
    } else {
        tracing::info!(from = %config.email_from, "using Resend email provider");
        Box::new(ResendEmailProvider::new(
            config.resend_api_key.clone(),
            config.email_from.clone(),
        ))
    };

    let (availability_tx, _) = broadcast::channel(256);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        payments: Box::new(StripeProvider::new(config.stripe_secret_key.clone())),
        notifier,
        admin_policy: Box::new(EmailAllowlist::new(config.admin_emails.clone())),
        outbox_notify: Notify::new(),
        availability_tx,
    });

    tokio::spawn(outbox::run_dispatcher(Arc::clone(&state)));

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
