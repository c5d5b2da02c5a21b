use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Identity};
use crate::services::cancellation;
use crate::state::AppState;

use super::parse_json;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

fn require_admin(state: &AppState, identity: &Identity) -> Result<(), AppError> {
    if state.admin_policy.is_authorized(identity) {
        Ok(())
    } else {
        tracing::warn!(user_id = %identity.user_id, "admin access denied");
        Err(AppError::Forbidden)
    }
}

// GET /api/admin/bookings?status=conflict_paid&limit=100
#[derive(Deserialize)]
pub struct AdminListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require_admin(&state, &identity)?;

    let status = match query.status.as_deref() {
        None => Some(BookingStatus::ConflictPaid),
        Some("all") => None,
        Some(raw) => Some(
            BookingStatus::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {raw}")))?,
        ),
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let rows = {
        let db = state.db()?;
        queries::get_bookings_by_status(&db, status, limit).map_err(AppError::store)?
    };
    Ok(Json(rows))
}

// POST /api/admin/bookings/:id/resolve
#[derive(Deserialize)]
pub struct ResolveRequest {
    pub note: String,
}

pub async fn resolve_booking(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Booking>, AppError> {
    require_admin(&state, &identity)?;
    let req: ResolveRequest = parse_json(&body)?;

    let booking = cancellation::resolve_conflict(&state, &id, &req.note)?;
    tracing::info!(booking_id = %id, admin = %identity.email, "admin resolved paid conflict");
    Ok(Json(booking))
}
