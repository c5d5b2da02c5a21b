use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::booking::{Room, Slot};

/// Upper bound on lines per cart. Keeps the compact date list well inside the
/// provider's 500-character metadata value limit.
pub const MAX_CART_LINES: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub date: NaiveDate,
    pub slot: Slot,
    pub room: Room,
    /// Accepted for compatibility with older clients and ignored.
    #[serde(default, skip_serializing)]
    pub price: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub lines: Vec<CartLine>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
    pub total_cents: i64,
    pub booking_ids: Vec<String>,
}

/// Compact session metadata: the payment provider caps metadata values, so only
/// the dates travel with the session. Full detail lives in the pending rows.
pub fn compact_dates(lines: &[CartLine]) -> String {
    let dates: Vec<String> = lines
        .iter()
        .map(|l| l.date.format("%Y-%m-%d").to_string())
        .collect();
    serde_json::to_string(&dates).unwrap_or_else(|_| "[]".to_string())
}
