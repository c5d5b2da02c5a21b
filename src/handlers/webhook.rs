use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::errors::AppError;
use crate::services::payments::webhook::{verify_stripe_signature, StripeEvent, CHECKOUT_COMPLETED};
use crate::services::reconcile::{self, Outcome};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

// POST /api/webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let secret = &state.config.stripe_webhook_secret;
    if secret.is_empty() {
        return Err(AppError::Config("STRIPE_WEBHOOK_SECRET is not set".to_string()));
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Err(e) = verify_stripe_signature(
        &body,
        signature,
        secret,
        state.config.stripe_webhook_tolerance_secs,
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!(error = %e, "rejected webhook with invalid signature");
        return Err(AppError::InvalidSignature(e.to_string()));
    }

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("invalid event payload: {e}")))?;

    if event.event_type != CHECKOUT_COMPLETED {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "ignoring webhook event");
        return Ok(Json(serde_json::json!({"received": true})));
    }

    let session = event
        .completed_session()
        .ok_or_else(|| AppError::Validation("malformed checkout session".to_string()))?;

    if !session.is_paid() {
        tracing::info!(
            event_id = %event.id,
            session_id = %session.id,
            payment_status = ?session.payment_status,
            "checkout completed without payment, skipping"
        );
        return Ok(Json(serde_json::json!({"received": true})));
    }

    tracing::info!(event_id = %event.id, session_id = %session.id, "reconciling checkout session");
    let report = reconcile::reconcile_completed_session(&state, &session);

    let failed = report.count(Outcome::Error);
    if failed > 0 {
        return Err(AppError::Store(format!(
            "{failed} booking(s) of session {} could not be settled",
            report.session_id
        )));
    }

    Ok(Json(serde_json::json!({
        "received": true,
        "session_id": report.session_id,
        "results": report.outcomes,
    })))
}
