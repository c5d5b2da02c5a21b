use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::models::{CheckoutRequest, CheckoutResponse, Identity};
use crate::services::checkout;
use crate::state::AppState;

use super::parse_json;

// POST /api/create-checkout-session
pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    body: Bytes,
) -> Result<Json<CheckoutResponse>, AppError> {
    let request: CheckoutRequest = parse_json(&body)?;
    let today = chrono::Local::now().date_naive();

    let response = checkout::create_checkout(&state, &identity, request, today).await?;
    Ok(Json(response))
}
